//! HTTP server for the conversion API.
//!
//! - [`handlers`]: request handlers and error mapping
//! - [`routes`]: router construction, CORS and tracing

pub mod handlers;
pub mod routes;

pub use handlers::{
    AppState, BatchItemResponse, BatchResponse, ConvertResponse, ErrorResponse, FileInfoResponse,
    HandlerError, HealthResponse, RenameRequest, RenameResponse, SERVICE_NAME,
};
pub use routes::{create_router, RouterConfig};
