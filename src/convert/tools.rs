//! External conversion tools.
//!
//! Each tool is reached through a one-method capability trait so the naming
//! and renaming logic in the dispatcher can run against fakes in tests. The
//! command-backed implementations shell out to:
//!
//! - [`Pdftoppm`] (poppler-utils): `pdftoppm -png -r <dpi> <pdf> <prefix>`
//! - [`LibreOffice`]: `libreoffice --headless --convert-to pdf --outdir <dir> <file>`
//! - [`ImageMagick`]: `convert <input> <output.png>`
//!
//! No timeout is applied; a hung tool blocks the request that started it.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;

// =============================================================================
// Capability Traits
// =============================================================================

/// Renders every page of a PDF to PNG.
///
/// Implementations write `<prefix>-<page>.png` for each page (page numbers may
/// be zero padded) or a bare `<prefix>.png` for single-page output.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &Path, output_prefix: &Path, dpi: u32)
        -> Result<(), ToolError>;
}

/// Converts an Office document to PDF.
#[async_trait]
pub trait OfficeConverter: Send + Sync {
    /// Write `<stem>.pdf` into `output_dir` and return its path.
    async fn convert_to_pdf(&self, document: &Path, output_dir: &Path)
        -> Result<PathBuf, ToolError>;
}

/// Re-encodes a single image as PNG.
#[async_trait]
pub trait ImageConverter: Send + Sync {
    async fn convert_to_png(&self, image: &Path, output: &Path) -> Result<(), ToolError>;
}

// =============================================================================
// Command-backed Implementations
// =============================================================================

/// `pdftoppm` from poppler-utils.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: String,
}

impl Pdftoppm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl Rasterizer for Pdftoppm {
    async fn rasterize(
        &self,
        pdf: &Path,
        output_prefix: &Path,
        dpi: u32,
    ) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf)
            .arg(output_prefix);

        run(&self.program, cmd).await
    }
}

/// LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct LibreOffice {
    program: String,
}

impl LibreOffice {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for LibreOffice {
    fn default() -> Self {
        Self::new("libreoffice")
    }
}

#[async_trait]
impl OfficeConverter for LibreOffice {
    async fn convert_to_pdf(
        &self,
        document: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(document);

        run(&self.program, cmd).await?;

        let stem = document.file_stem().unwrap_or_default().to_string_lossy();
        let pdf = output_dir.join(format!("{}.pdf", stem));
        expect_output(&self.program, pdf).await
    }
}

/// ImageMagick `convert`.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    program: String,
}

impl ImageMagick {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self::new("convert")
    }
}

#[async_trait]
impl ImageConverter for ImageMagick {
    async fn convert_to_png(&self, image: &Path, output: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image).arg(output);

        run(&self.program, cmd).await?;
        expect_output(&self.program, output.to_path_buf())
            .await
            .map(|_| ())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Run a command to completion, failing on a nonzero exit status.
async fn run(tool: &str, mut cmd: Command) -> Result<(), ToolError> {
    debug!(tool = tool, command = ?cmd.as_std(), "Running conversion tool");

    let output = cmd.output().await.map_err(|e| ToolError::Spawn {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            output: combined_output(&output),
        });
    }

    Ok(())
}

/// Stdout followed by stderr, lossily decoded.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

async fn expect_output(tool: &str, path: PathBuf) -> Result<PathBuf, ToolError> {
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        _ => Err(ToolError::MissingOutput {
            tool: tool.to_string(),
            path: path.display().to_string(),
        }),
    }
}
