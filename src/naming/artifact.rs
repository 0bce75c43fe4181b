//! Final filenames for converted pages.

use std::path::{Path, PathBuf};

use super::order::simplify_order_id;

/// Extension of every converted artifact.
pub const ARTIFACT_EXTENSION: &str = "png";

/// Compose `"<order>-<source>-<page>.png"`.
///
/// `page` is 1-based.
pub fn artifact_file_name(order: &str, source_id: &str, page: usize) -> String {
    format!("{}-{}-{}.{}", order, source_id, page, ARTIFACT_EXTENSION)
}

/// Names the pages produced from one source file.
///
/// Holds the already-simplified order token and the source identifier so a
/// dispatcher can ask for page paths without repeating either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    order: String,
    source_id: String,
}

impl ArtifactNamer {
    /// Create a namer from a raw order id, simplifying it first.
    pub fn new(order_id: &str, source_id: impl Into<String>) -> Self {
        Self {
            order: simplify_order_id(order_id),
            source_id: source_id.into(),
        }
    }

    /// The simplified order token.
    pub fn order(&self) -> &str {
        &self.order
    }

    /// The source identifier.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Filename for a 1-based page.
    pub fn file_name(&self, page: usize) -> String {
        artifact_file_name(&self.order, &self.source_id, page)
    }

    /// Full path for a 1-based page inside `dir`.
    pub fn path_in(&self, dir: &Path, page: usize) -> PathBuf {
        dir.join(self.file_name(page))
    }
}
