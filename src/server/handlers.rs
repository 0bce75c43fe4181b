//! HTTP request handlers for the conversion API.
//!
//! # Endpoints
//!
//! - `POST /api/convert` - Convert one file to PNG pages
//! - `POST /api/convert-batch` - Convert several files under one order
//! - `POST /api/rename` - Rename a converted file
//! - `GET /file-info/{filename}` - Look up a converted file
//! - `GET /health`, `GET /api/health` - Health check
//!
//! Every JSON response carries a `success` flag. Failures use the
//! [`ErrorResponse`] envelope with a short `message` and the detailed `error`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::convert::{BatchRequest, ConversionService, ConvertRequest};
use crate::error::{ConvertError, StorageError};
use crate::storage::ConvertedStore;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "convert-svc";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Runs single and batch conversions
    pub service: Arc<ConversionService>,

    /// Rename and lookup on the converted tree
    pub store: Arc<ConvertedStore>,
}

impl AppState {
    pub fn new(service: ConversionService, store: ConvertedStore) -> Self {
        Self {
            service: Arc::new(service),
            store: Arc::new(store),
        }
    }

    /// Build the state from the service configuration.
    pub fn from_service(service: ConversionService) -> Self {
        let config = service.config();
        let store = ConvertedStore::new(
            config.storage.converted_dir.clone(),
            config.public_base_url(),
        );
        Self::new(service, store)
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/rename`.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// Path relative to the converted root
    pub original_path: String,

    /// New file name, kept in the same directory
    pub new_name: String,

    /// Accepted for compatibility, not used
    #[serde(default)]
    pub order_id: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error envelope returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Short summary (e.g., "File not found")
    pub message: String,

    /// Detailed error text
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: error.into(),
        }
    }
}

/// Response of a single conversion.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,

    /// Paths of the produced pages, in page order
    pub files: Vec<PathBuf>,
}

/// Outcome of one batch item.
#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of a batch conversion.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// True when every item succeeded
    pub success: bool,
    pub message: String,
    pub batch_id: String,

    /// Per-item results keyed by the requested file path
    pub results: BTreeMap<String, BatchItemResponse>,
}

/// Response of a rename.
#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub success: bool,
    pub message: String,

    /// New path relative to the converted root
    pub new_path: String,

    /// Public URL of the renamed file
    pub new_url: String,
}

/// Response of a file lookup.
#[derive(Debug, Serialize)]
pub struct FileInfoResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log an error response based on its severity and build the envelope.
///
/// 5xx errors are logged at ERROR, 404 at DEBUG, other 4xx at WARN.
fn error_response(status: StatusCode, message: &str, detail: String) -> Response {
    if status.is_server_error() {
        error!(status = status.as_u16(), "Server error: {}", detail);
    } else if status == StatusCode::NOT_FOUND {
        debug!(status = status.as_u16(), "Resource not found: {}", detail);
    } else {
        warn!(status = status.as_u16(), "Client error: {}", detail);
    }

    (status, Json(ErrorResponse::new(message, detail))).into_response()
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ConvertError::SourceNotFound { .. } => (StatusCode::NOT_FOUND, "File not found"),
            ConvertError::NotAFile { .. } => (StatusCode::BAD_REQUEST, "Not a regular file"),
            ConvertError::UnsupportedExtension { .. } => {
                (StatusCode::BAD_REQUEST, "Unsupported file type")
            }
            ConvertError::CreateDir { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create output directory",
            ),
            ConvertError::Tool(_)
            | ConvertError::Discover { .. }
            | ConvertError::NoPages { .. }
            | ConvertError::Background(_)
            | ConvertError::Rename { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "File conversion failed")
            }
        };

        error_response(status, message, self.to_string())
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found"),
            StorageError::NotRegularFile(_) => (StatusCode::BAD_REQUEST, "Not a regular file"),
            StorageError::InvalidName(_) => (StatusCode::BAD_REQUEST, "Invalid file name"),
            StorageError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage operation failed"),
        };

        error_response(status, message, self.to_string())
    }
}

/// Any failure a handler can return.
#[derive(Debug)]
pub enum HandlerError {
    /// Body could not be parsed as the expected JSON
    InvalidBody(String),
    Convert(ConvertError),
    Storage(StorageError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::InvalidBody(detail) => {
                error_response(StatusCode::BAD_REQUEST, "Malformed request", detail)
            }
            HandlerError::Convert(err) => err.into_response(),
            HandlerError::Storage(err) => err.into_response(),
        }
    }
}

impl From<JsonRejection> for HandlerError {
    fn from(rejection: JsonRejection) -> Self {
        HandlerError::InvalidBody(rejection.body_text())
    }
}

impl From<ConvertError> for HandlerError {
    fn from(err: ConvertError) -> Self {
        HandlerError::Convert(err)
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        HandlerError::Storage(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// `GET /health` and `GET /api/health` return:
/// ```json
/// { "status": "ok", "service": "convert-svc", "version": "0.1.0" }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle single conversions.
///
/// # Endpoint
///
/// `POST /api/convert`
///
/// # Body
///
/// ```json
/// { "file_path": "uploads/a.pdf", "order_id": "20250609-fca939e7", "dpi": 300 }
/// ```
///
/// # Response
///
/// - `200 OK`: `{ "success": true, "message": ..., "files": [...] }`
/// - `400 Bad Request`: Malformed body or unsupported extension
/// - `404 Not Found`: Source file does not exist
/// - `500 Internal Server Error`: Conversion tool failure
pub async fn convert_handler(
    State(state): State<AppState>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, HandlerError> {
    let Json(request) = body?;
    let files = state.service.convert(request).await?;

    Ok(Json(ConvertResponse {
        success: true,
        message: "File converted successfully".to_string(),
        files,
    }))
}

/// Handle batch conversions.
///
/// # Endpoint
///
/// `POST /api/convert-batch`
///
/// Item failures do not fail the request: the response is `200 OK` with
/// `success` false and the failing items carrying an `error`. Only a
/// malformed body is rejected with `400 Bad Request`.
pub async fn convert_batch_handler(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, HandlerError> {
    let Json(request) = body?;

    let outcome = state.service.convert_batch(request).await;
    let success = outcome.success();

    let results = outcome
        .results
        .into_iter()
        .map(|(path, result)| {
            let item = match result {
                Ok(files) => BatchItemResponse {
                    success: true,
                    files: Some(files),
                    error: None,
                },
                Err(e) => BatchItemResponse {
                    success: false,
                    files: None,
                    error: Some(e.to_string()),
                },
            };
            (path, item)
        })
        .collect();

    Ok(Json(BatchResponse {
        success,
        message: "Batch conversion finished".to_string(),
        batch_id: outcome.batch_id,
        results,
    }))
}

/// Handle renames inside the converted tree.
///
/// # Endpoint
///
/// `POST /api/rename`
///
/// An existing file with the new name is replaced.
///
/// # Response
///
/// - `200 OK`: `{ "success": true, "new_path": ..., "new_url": ... }`
/// - `400 Bad Request`: Malformed body or invalid new name
/// - `404 Not Found`: Original file does not exist
pub async fn rename_handler(
    State(state): State<AppState>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<RenameResponse>, HandlerError> {
    let Json(request) = body?;

    let renamed = state
        .store
        .rename(&request.original_path, &request.new_name)
        .await?;
    info!(
        from = %request.original_path,
        to = %renamed.relative_path,
        "Renamed converted file"
    );

    Ok(Json(RenameResponse {
        success: true,
        message: "File renamed successfully".to_string(),
        new_path: renamed.relative_path,
        new_url: renamed.url,
    }))
}

/// Handle file lookups.
///
/// # Endpoint
///
/// `GET /file-info/{filename}`
///
/// The file is looked up at the top of the converted tree first, then
/// anywhere below it.
pub async fn file_info_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<FileInfoResponse>, HandlerError> {
    let info = state.store.file_info(&filename).await?;

    Ok(Json(FileInfoResponse {
        success: true,
        filename: info.filename,
        url: info.url,
        mime_type: info.mime_type,
        size: info.size,
    }))
}

// =============================================================================
// Tests
// =============================================================================
