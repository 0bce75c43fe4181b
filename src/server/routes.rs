//! Router configuration for the conversion service.
//!
//! # Route Structure
//!
//! ```text
//! /health, /api/health          - Health check
//! /api/convert                  - Single conversion (POST)
//! /api/convert-batch            - Batch conversion (POST)
//! /api/rename                   - Rename a converted file (POST)
//! /file-info/{filename}         - Converted file lookup
//! /files/...                    - Static converted tree
//! ```
//!
//! # Example
//!
//! ```ignore
//! use convert_svc::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::from_service(ConversionService::from_config(config));
//! let router = create_router(state, RouterConfig::new("storage/converted"));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    convert_batch_handler, convert_handler, file_info_handler, health_handler, rename_handler,
    AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory served under `/files`
    pub files_dir: PathBuf,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration serving `files_dir` under `/files`.
    ///
    /// By default CORS allows any origin and tracing is enabled.
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/convert", post(convert_handler))
        .route("/convert-batch", post(convert_batch_handler))
        .route("/rename", post(rename_handler));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/file-info/{filename}", get(file_info_handler))
        .nest("/api", api_routes)
        .nest_service("/files", ServeDir::new(&config.files_dir))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
