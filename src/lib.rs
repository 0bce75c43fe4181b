//! # convert-svc
//!
//! An HTTP service that converts PDF, Office and image files into PNG pages
//! with deterministic, order-scoped file names.
//!
//! ## Features
//!
//! - **PDF rasterization**: One PNG per page via `pdftoppm`
//! - **Office documents**: Converted to PDF with LibreOffice, then rasterized
//! - **Images**: Re-encoded to a single PNG with ImageMagick
//! - **Stable names**: `<order>-<source>-<page>.png`, where the source token is
//!   derived from the file content
//! - **Batches**: Several files under one order, each failing independently
//!
//! ## Architecture
//!
//! - [`naming`] - Order simplification, source identifiers and artifact names
//! - [`convert`] - Tool wrappers, the dispatcher and the request service
//! - [`storage`] - Rename and lookup inside the converted tree
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and YAML configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use convert_svc::{AppConfig, AppState, ConversionService, RouterConfig, create_router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(AppConfig::default());
//!     let files_dir = config.storage.converted_dir.clone();
//!
//!     let state = AppState::from_service(ConversionService::from_config(config));
//!     let router = create_router(state, RouterConfig::new(files_dir));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod naming;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::{AppConfig, Cli, ConversionConfig, Mode, ServerConfig, StorageConfig, ToolsConfig};
pub use convert::{
    discover_pages, BatchOutcome, BatchRequest, ConversionJob, ConversionService, ConvertRequest,
    Dispatcher, ImageConverter, ImageMagick, LibreOffice, OfficeConverter, Pdftoppm, Rasterizer,
    SourceKind,
};
pub use error::{ConfigError, ConvertError, StorageError, ToolError};
pub use naming::{
    artifact_file_name, derive_nested_source_id, derive_source_id, resolve_source_id,
    simplify_order_id, ArtifactNamer,
};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use storage::{ConvertedStore, FileInfo, RenamedFile};
