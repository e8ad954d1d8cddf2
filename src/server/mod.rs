//! HTTP server layer for the image relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                  POST /   (bearer token, JSON)                  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │   routes    │  │    auth     │  │        handlers         │  │
//! │  │ (method,    │─►│ (bearer,    │─►│ (validate, resolve,     │  │
//! │  │  path, CORS)│  │  constant   │  │  generate, respond)     │  │
//! │  │             │  │  time)      │  │                         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{auth_middleware, extract_bearer_token, AuthError, BearerAuth};
pub use handlers::{
    generate_handler, method_not_allowed_handler, preflight_handler, AppState, ErrorResponse,
};
pub use routes::{create_router, RouterConfig};
