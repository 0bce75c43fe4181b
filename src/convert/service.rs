//! Conversion service for single and batch requests.
//!
//! The service turns loosely specified requests into fully resolved
//! [`ConversionJob`]s and hands them to the [`Dispatcher`]:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      ConversionService                        │
//! │  1. Check the source exists    4. Resolve DPI                 │
//! │  2. Check the extension        5. Dispatch                    │
//! │  3. Resolve output directory   6. Delete original (optional)  │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 ▼
//!                           ┌────────────┐
//!                           │ Dispatcher │
//!                           └────────────┘
//! ```
//!
//! Batches run their items one after another. An item failure is recorded in
//! the result map and never stops the rest of the batch; already converted
//! files are left on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ConvertError;

use super::dispatcher::{ConversionJob, Dispatcher, SourceKind};

// =============================================================================
// Requests
// =============================================================================

/// A single conversion request as received over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    /// File to convert
    pub file_path: PathBuf,

    /// Output directory (default: `<converted>/<order_id>` or `<converted>`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Rasterization DPI (default: configured DPI; 0 also means default)
    #[serde(default)]
    pub dpi: Option<u32>,

    /// Grouping key for the output directory and artifact names
    #[serde(default)]
    pub order_id: Option<String>,

    /// Caller-supplied source identifier (skips derivation)
    #[serde(default)]
    pub source_id: Option<String>,

    /// Identifier of the containing document
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl ConvertRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            output_dir: None,
            dpi: None,
            order_id: None,
            source_id: None,
            parent_id: None,
        }
    }

    fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref().filter(|id| !id.is_empty())
    }

    fn output_dir(&self) -> Option<&Path> {
        self.output_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// A batch of conversions sharing an optional order id.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub files: Vec<ConvertRequest>,

    #[serde(default)]
    pub order_id: Option<String>,
}

/// Per-file results of a batch, keyed by the requested path.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Generated batch identifier (the default output subdirectory)
    pub batch_id: String,

    /// Result for every requested path
    pub results: BTreeMap<String, Result<Vec<PathBuf>, ConvertError>>,
}

impl BatchOutcome {
    /// True when every item converted.
    pub fn success(&self) -> bool {
        self.results.values().all(|r| r.is_ok())
    }

    /// Number of items that converted.
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }
}

// =============================================================================
// Conversion Service
// =============================================================================

/// Applies configured defaults to requests and runs them.
#[derive(Clone)]
pub struct ConversionService {
    config: Arc<AppConfig>,
    dispatcher: Dispatcher,
}

impl ConversionService {
    pub fn new(config: Arc<AppConfig>, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Create a service running the configured command-line tools.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let dispatcher = Dispatcher::from_tools(&config.tools)
            .with_keep_intermediate_pdf(config.conversion.keep_intermediate_pdf);
        Self::new(config, dispatcher)
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Convert one file.
    ///
    /// Errors are ordered: a missing source is reported before an unsupported
    /// extension, and neither writes anything to disk.
    pub async fn convert(&self, request: ConvertRequest) -> Result<Vec<PathBuf>, ConvertError> {
        check_source(&request.file_path).await?;
        SourceKind::from_path(&request.file_path)?;

        let output_dir = match request.output_dir() {
            Some(dir) => dir.to_path_buf(),
            None => match request.order_id() {
                Some(order) => self.config.storage.converted_dir.join(order),
                None => self.config.storage.converted_dir.clone(),
            },
        };

        let job = self.job(request, output_dir);
        let files = self.dispatcher.convert(&job).await?;
        self.remove_original(&job.source).await;
        Ok(files)
    }

    /// Convert every file of a batch, independently and in order.
    pub async fn convert_batch(&self, request: BatchRequest) -> BatchOutcome {
        let batch_id = Uuid::new_v4().to_string();
        let batch_order = request.order_id.filter(|id| !id.is_empty());

        let root = self
            .config
            .storage
            .converted_dir
            .join(batch_order.as_deref().unwrap_or(&batch_id));
        if let Err(e) = tokio::fs::create_dir_all(&root).await {
            warn!(path = %root.display(), error = %e, "Failed to create batch directory");
        }

        info!(
            batch_id = %batch_id,
            files = request.files.len(),
            output = %root.display(),
            "Starting batch conversion"
        );

        let mut results = BTreeMap::new();
        for mut item in request.files {
            let key = item.file_path.display().to_string();

            if item.order_id().is_none() {
                item.order_id = batch_order.clone();
            }
            let output_dir = item
                .output_dir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone());

            let result = self.convert_batch_item(item, output_dir).await;
            if let Err(e) = &result {
                warn!(file = %key, error = %e, "Batch item failed");
            }
            results.insert(key, result);
        }

        let outcome = BatchOutcome { batch_id, results };
        info!(
            batch_id = %outcome.batch_id,
            succeeded = outcome.succeeded(),
            total = outcome.results.len(),
            "Finished batch conversion"
        );
        outcome
    }

    async fn convert_batch_item(
        &self,
        item: ConvertRequest,
        output_dir: PathBuf,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        check_source(&item.file_path).await?;

        let job = self.job(item, output_dir);
        let files = self.dispatcher.convert(&job).await?;
        self.remove_original(&job.source).await;
        Ok(files)
    }

    fn job(&self, request: ConvertRequest, output_dir: PathBuf) -> ConversionJob {
        let dpi = request
            .dpi
            .filter(|dpi| *dpi > 0)
            .unwrap_or(self.config.conversion.dpi);

        ConversionJob::new(request.file_path, output_dir, dpi)
            .with_order_id(request.order_id)
            .with_source_id(request.source_id)
            .with_parent_id(request.parent_id)
    }

    async fn remove_original(&self, source: &Path) {
        if !self.config.conversion.delete_original {
            return;
        }
        match tokio::fs::remove_file(source).await {
            Ok(()) => debug!(path = %source.display(), "Deleted original file"),
            Err(e) => warn!(path = %source.display(), error = %e, "Failed to delete original file"),
        }
    }
}

/// The source must exist and be a regular file.
async fn check_source(path: &Path) -> Result<(), ConvertError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ConvertError::NotAFile {
            path: path.display().to_string(),
        }),
        Err(_) => Err(ConvertError::SourceNotFound {
            path: path.display().to_string(),
        }),
    }
}
