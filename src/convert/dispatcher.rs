//! Conversion dispatch.
//!
//! The dispatcher picks a pipeline from the source file's extension, runs the
//! external tools, then renames whatever the tools wrote to the final
//! artifact names:
//!
//! ```text
//! .pdf                 → rasterize ───────────────┐
//! .doc/.docx/.ppt/...  → office → PDF → rasterize ├─→ rename to <order>-<source>-<page>.png
//! .jpg/.png/.gif/...   → reformat ────────────────┘
//! ```
//!
//! Tool output is written under a per-call temp prefix (`tmp_<8 hex>`), found
//! again by glob and renamed, so callers never see a tool's own naming.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ToolsConfig;
use crate::error::ConvertError;
use crate::naming::{resolve_source_id, ArtifactNamer, ARTIFACT_EXTENSION};

use super::tools::{
    ImageConverter, ImageMagick, LibreOffice, OfficeConverter, Pdftoppm, Rasterizer,
};

// =============================================================================
// Source Kind
// =============================================================================

/// Extensions rendered directly by the rasterizer.
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Extensions converted to PDF by the office converter first.
pub const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "ppt", "pptx", "xls", "xlsx", "odt", "odp", "ods", "rtf",
];

/// Extensions re-encoded by the image converter.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Which pipeline a source file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Rasterize directly
    Pdf,
    /// Office document → PDF → rasterize
    Office,
    /// Single image → PNG
    Image,
}

impl SourceKind {
    /// Look up a lower-cased extension without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if PDF_EXTENSIONS.contains(&ext) {
            Some(SourceKind::Pdf)
        } else if OFFICE_EXTENSIONS.contains(&ext) {
            Some(SourceKind::Office)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(SourceKind::Image)
        } else {
            None
        }
    }

    /// Classify a path by its extension (case-insensitive).
    ///
    /// The error names the offending extension with its dot, e.g. `.txt`.
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        Self::from_extension(&ext).ok_or_else(|| ConvertError::UnsupportedExtension {
            extension: if ext.is_empty() {
                String::new()
            } else {
                format!(".{}", ext)
            },
        })
    }
}

// =============================================================================
// Conversion Job
// =============================================================================

/// A fully resolved conversion: every default has already been applied.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// File to convert
    pub source: PathBuf,

    /// Directory receiving the converted pages
    pub output_dir: PathBuf,

    /// Rasterization resolution (ignored for images)
    pub dpi: u32,

    /// Grouping key used in artifact names
    pub order_id: Option<String>,

    /// Caller-supplied source identifier (skips derivation)
    pub source_id: Option<String>,

    /// Identifier of the containing document, for nested sources
    pub parent_id: Option<String>,
}

impl ConversionJob {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            dpi,
            order_id: None,
            source_id: None,
            parent_id: None,
        }
    }

    pub fn with_order_id(mut self, order_id: Option<String>) -> Self {
        self.order_id = order_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_source_id(mut self, source_id: Option<String>) -> Self {
        self.source_id = source_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_parent_id(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id.filter(|id| !id.is_empty());
        self
    }

    /// The order key embedded in artifact names.
    ///
    /// The explicit order id when present, otherwise the output directory's
    /// final component (which is the order id whenever the directory was
    /// derived from one).
    pub fn order_key(&self) -> String {
        match &self.order_id {
            Some(order) => order.clone(),
            None => self
                .output_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes conversion jobs to the external tools and names their output.
#[derive(Clone)]
pub struct Dispatcher {
    rasterizer: Arc<dyn Rasterizer>,
    office: Arc<dyn OfficeConverter>,
    image: Arc<dyn ImageConverter>,
    keep_intermediate_pdf: bool,
}

impl Dispatcher {
    /// Create a dispatcher over the given tools.
    pub fn new(
        rasterizer: impl Rasterizer + 'static,
        office: impl OfficeConverter + 'static,
        image: impl ImageConverter + 'static,
    ) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            office: Arc::new(office),
            image: Arc::new(image),
            keep_intermediate_pdf: true,
        }
    }

    /// Create a dispatcher running the configured command-line tools.
    pub fn from_tools(tools: &ToolsConfig) -> Self {
        Self::new(
            Pdftoppm::new(&tools.pdftoppm),
            LibreOffice::new(&tools.libreoffice),
            ImageMagick::new(&tools.convert),
        )
    }

    /// Keep or delete the PDF produced from an Office document.
    pub fn with_keep_intermediate_pdf(mut self, keep: bool) -> Self {
        self.keep_intermediate_pdf = keep;
        self
    }

    /// Convert one source file and return the artifact paths in page order.
    ///
    /// The extension is checked before anything touches the filesystem.
    pub async fn convert(&self, job: &ConversionJob) -> Result<Vec<PathBuf>, ConvertError> {
        let kind = SourceKind::from_path(&job.source)?;

        create_output_dir(&job.output_dir).await?;

        // Derived from the original file, before any intermediate PDF exists
        let source_id = {
            let explicit = job.source_id.clone();
            let source = job.source.clone();
            let parent = job.parent_id.clone();
            tokio::task::spawn_blocking(move || {
                resolve_source_id(explicit.as_deref(), &source, parent.as_deref())
            })
            .await
            .map_err(|e| ConvertError::Background(e.to_string()))?
        };
        let namer = ArtifactNamer::new(&job.order_key(), source_id);

        debug!(
            source = %job.source.display(),
            kind = ?kind,
            order = namer.order(),
            source_id = namer.source_id(),
            "Dispatching conversion"
        );

        let files = match kind {
            SourceKind::Pdf => self.rasterize(&job.source, job, &namer).await?,
            SourceKind::Office => {
                let pdf = self
                    .office
                    .convert_to_pdf(&job.source, &job.output_dir)
                    .await?;
                let files = self.rasterize(&pdf, job, &namer).await?;
                if !self.keep_intermediate_pdf {
                    if let Err(e) = tokio::fs::remove_file(&pdf).await {
                        warn!(path = %pdf.display(), error = %e, "Failed to remove intermediate PDF");
                    }
                }
                files
            }
            SourceKind::Image => vec![self.reformat(job, &namer).await?],
        };

        info!(
            source = %job.source.display(),
            pages = files.len(),
            source_id = namer.source_id(),
            "Converted file"
        );

        Ok(files)
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        job: &ConversionJob,
        namer: &ArtifactNamer,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let prefix = temp_prefix();
        let output_prefix = job.output_dir.join(&prefix);

        self.rasterizer
            .rasterize(pdf, &output_prefix, job.dpi)
            .await?;

        let pages = {
            let dir = job.output_dir.clone();
            let prefix = prefix.clone();
            tokio::task::spawn_blocking(move || discover_pages(&dir, &prefix))
                .await
                .map_err(|e| ConvertError::Background(e.to_string()))??
        };
        if pages.is_empty() {
            return Err(ConvertError::NoPages {
                source_path: pdf.display().to_string(),
            });
        }

        let total = pages.len();
        let mut files = Vec::with_capacity(total);
        for (index, tmp) in pages.into_iter().enumerate() {
            let page = index + 1;
            let target = namer.path_in(&job.output_dir, page);
            debug!(
                page = page,
                total = total,
                from = %tmp.display(),
                to = %target.display(),
                "Renaming converted page"
            );
            rename(&tmp, &target).await?;
            files.push(target);
        }

        Ok(files)
    }

    async fn reformat(
        &self,
        job: &ConversionJob,
        namer: &ArtifactNamer,
    ) -> Result<PathBuf, ConvertError> {
        let tmp = job
            .output_dir
            .join(format!("{}.{}", temp_prefix(), ARTIFACT_EXTENSION));

        self.image.convert_to_png(&job.source, &tmp).await?;

        let target = namer.path_in(&job.output_dir, 1);
        rename(&tmp, &target).await?;
        Ok(target)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn temp_prefix() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("tmp_{}", &token[..8])
}

async fn create_output_dir(dir: &Path) -> Result<(), ConvertError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ConvertError::CreateDir {
            path: dir.display().to_string(),
            message: e.to_string(),
        })
}

async fn rename(from: &Path, to: &Path) -> Result<(), ConvertError> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| ConvertError::Rename {
            from: from.display().to_string(),
            to: to.display().to_string(),
            message: e.to_string(),
        })
}

/// Find the pages a rasterizer wrote under `<dir>/<prefix>`.
///
/// Multi-page output is `<prefix>-<n>.png`, ordered by the numeric value of
/// `<n>` so the result does not depend on zero padding or directory order.
/// With no numbered pages, a bare `<prefix>.png` is taken as a single page.
pub fn discover_pages(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, ConvertError> {
    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!(
        "{}/{}-*.{}",
        escaped_dir.trim_end_matches('/'),
        prefix,
        ARTIFACT_EXTENSION
    );

    let matches = glob::glob(&pattern).map_err(|e| ConvertError::Discover {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut pages = Vec::new();
    for entry in matches {
        let path = entry.map_err(|e| ConvertError::Discover {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        pages.push(path);
    }

    if pages.is_empty() {
        let single = dir.join(format!("{}.{}", prefix, ARTIFACT_EXTENSION));
        if single.is_file() {
            pages.push(single);
        }
        return Ok(pages);
    }

    pages.sort_by_key(|path| (page_number(path, prefix), path.clone()));
    Ok(pages)
}

/// The `<n>` of `<prefix>-<n>.png`; unnumbered names sort last.
fn page_number(path: &Path, prefix: &str) -> u64 {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(|stem| stem.strip_prefix(prefix))
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}
