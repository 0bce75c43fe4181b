//! convert-svc - HTTP file conversion service.
//!
//! This binary loads the configuration, starts the HTTP server and shuts it
//! down gracefully on Ctrl-C or SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use convert_svc::{
    config::{AppConfig, Cli},
    convert::ConversionService,
    server::{create_router, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let created = !cli.config.exists();
    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.log_filter(cli.verbose));
    if created {
        info!(path = %cli.config.display(), "Wrote default configuration");
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = config.ensure_storage_dirs() {
        error!("Failed to create storage directories: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(cli, config).await
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(cli: Cli, config: AppConfig) -> ExitCode {
    info!("convert-svc v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  File: {}", cli.config.display());
    info!("  Mode: {:?}", config.server.mode);
    info!("  Uploads: {}", config.storage.upload_dir.display());
    info!("  Converted: {}", config.storage.converted_dir.display());
    info!("  Archive: {}", config.storage.archive_dir.display());
    info!("  DPI: {}", config.conversion.dpi);
    info!(
        "  Tools: pdftoppm={}, libreoffice={}, convert={}",
        config.tools.pdftoppm, config.tools.libreoffice, config.tools.convert
    );
    if config.conversion.delete_original {
        warn!("  Original files are deleted after a successful conversion");
    }

    let router_config = build_router_config(&cli, &config);
    let addr = config.bind_address();
    let base_url = config.public_base_url();

    let service = ConversionService::from_config(Arc::new(config));
    let router = create_router(AppState::from_service(service), router_config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: {}", addr);
    info!("  Converted files served at: {}/files/", base_url);
    info!("");
    info!("  Try:");
    info!("    curl {}/health", base_url);
    info!(
        "    curl -X POST {}/api/convert -H 'Content-Type: application/json' \\",
        base_url
    );
    info!("         -d '{{\"file_path\": \"storage/uploads/example.pdf\"}}'");
    info!("────────────────────────────────────────────────────────────────");

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

/// Initialize the tracing/logging subsystem.
///
/// `RUST_LOG` takes precedence over `default_filter`.
fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the CLI and the loaded configuration.
fn build_router_config(cli: &Cli, config: &AppConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.storage.converted_dir.clone());

    if let Some(ref origins) = config.server.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!cli.no_tracing)
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
