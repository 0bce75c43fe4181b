//! Conversion layer.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ConversionService             │
//! │  (request defaults, batches, cleanup)   │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               Dispatcher                │
//! │  (extension routing, page renaming)     │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┼───────────┐
//!          ▼           ▼           ▼
//!    ┌──────────┐ ┌──────────┐ ┌──────────┐
//!    │Rasterizer│ │ Office   │ │  Image   │
//!    │(pdftoppm)│ │Converter │ │Converter │
//!    └──────────┘ └──────────┘ └──────────┘
//! ```

mod dispatcher;
mod service;
mod tools;

pub use dispatcher::{
    discover_pages, ConversionJob, Dispatcher, SourceKind, IMAGE_EXTENSIONS, OFFICE_EXTENSIONS,
    PDF_EXTENSIONS,
};
pub use service::{BatchOutcome, BatchRequest, ConversionService, ConvertRequest};
pub use tools::{
    ImageConverter, ImageMagick, LibreOffice, OfficeConverter, Pdftoppm, Rasterizer,
};
