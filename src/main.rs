//! Image Relay - authenticated image generation over HTTP.
//!
//! This binary parses configuration, wires the Workers AI backend into the
//! router and serves until Ctrl-C.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_relay::{backend::WorkersAiGenerator, config::Config, server::create_router};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let router_config = config.router_config();

    info!("Image Relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Backend: {}", config.cf_base_url);
    info!("  Default model: {}", router_config.models.default_model());
    info!("  Allowed models: {}", router_config.models.models().join(", "));
    info!("  Alignment: {}", router_config.resolver.alignment());
    info!(
        "  CORS origin: {}",
        config.cors_origin.as_deref().unwrap_or("*")
    );
    info!("  Generate timeout: {}s", config.generate_timeout_secs);
    info!("  Max body: {} bytes", config.max_body_bytes);

    // validate() guarantees both are present
    let generator = WorkersAiGenerator::new(
        config.cf_account_id.clone().unwrap_or_default(),
        config.cf_api_token.clone().unwrap_or_default(),
    )
    .with_base_url(config.cf_base_url.clone());

    let router = create_router(generator, router_config);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_relay=debug,tower_http=debug"
    } else {
        "image_relay=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
