//! Operations on the converted-files tree.
//!
//! Converted pages live under a single root directory, served statically at
//! `/files/`. This module renames files inside that tree and looks files up
//! by name, returning the public URL for each.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::StorageError;

/// MIME type reported for every converted file.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Result of a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    /// New path relative to the converted root, `/`-separated
    pub relative_path: String,

    /// Public URL of the renamed file
    pub url: String,
}

/// Metadata returned by a file lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
}

/// The converted-files root plus the base URL it is served under.
#[derive(Debug, Clone)]
pub struct ConvertedStore {
    root: PathBuf,
    base_url: String,
}

impl ConvertedStore {
    /// Create a store rooted at `root`, linking files under `<base_url>/files/`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public URL for a path relative to the root.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/files/{}", self.base_url, relative)
    }

    /// Rename a converted file within its directory.
    ///
    /// `original` is relative to the root; an absolute path is used only when
    /// it lies under the root. An existing file at the destination is replaced.
    pub async fn rename(
        &self,
        original: &str,
        new_name: &str,
    ) -> Result<RenamedFile, StorageError> {
        validate_file_name(new_name)?;
        if Path::new(original)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(StorageError::InvalidName(original.to_string()));
        }

        // Absolute paths are accepted only when they already point under the root
        let requested = Path::new(original);
        let original_path = if requested.starts_with(&self.root) {
            requested.to_path_buf()
        } else if requested
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        {
            return Err(StorageError::InvalidName(original.to_string()));
        } else {
            self.root.join(requested)
        };
        if !original_path.starts_with(&self.root) {
            return Err(StorageError::InvalidName(original.to_string()));
        }

        if !tokio::fs::try_exists(&original_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(original.to_string()));
        }

        let dir = original_path.parent().unwrap_or(self.root.as_path());
        let new_path = dir.join(new_name);

        if new_path != original_path && tokio::fs::try_exists(&new_path).await.unwrap_or(false) {
            debug!(path = %new_path.display(), "Replacing existing file at rename destination");
            tokio::fs::remove_file(&new_path).await.map_err(|e| {
                StorageError::Io(format!("cannot replace {}: {}", new_path.display(), e))
            })?;
        }

        tokio::fs::rename(&original_path, &new_path)
            .await
            .map_err(|e| StorageError::Io(format!("rename failed: {}", e)))?;

        let relative_path = match new_path.strip_prefix(&self.root) {
            Ok(rel) => to_url_path(rel),
            Err(_) => new_name.to_string(),
        };
        let url = self.url_for(&relative_path);

        Ok(RenamedFile { relative_path, url })
    }

    /// Look a file up by name: first at the top of the root, then anywhere
    /// below it (first match in lexical walk order).
    pub async fn file_info(&self, filename: &str) -> Result<FileInfo, StorageError> {
        validate_file_name(filename)?;

        let direct = self.root.join(filename);
        let (path, meta) = match tokio::fs::metadata(&direct).await {
            Ok(meta) => (direct, meta),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let root = self.root.clone();
                let name = filename.to_string();
                let found = tokio::task::spawn_blocking(move || find_file(&root, &name))
                    .await
                    .map_err(|e| StorageError::Io(e.to_string()))?
                    .map_err(|e| {
                        debug!(error = %e, "Converted tree walk failed");
                        StorageError::NotFound(filename.to_string())
                    })?;

                let path = found.ok_or_else(|| StorageError::NotFound(filename.to_string()))?;
                let meta = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| StorageError::Io(e.to_string()))?;
                (path, meta)
            }
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        if !meta.is_file() {
            return Err(StorageError::NotRegularFile(filename.to_string()));
        }

        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => to_url_path(rel),
            Err(_) => filename.to_string(),
        };

        Ok(FileInfo {
            filename: filename.to_string(),
            url: self.url_for(&relative),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            size: meta.len(),
        })
    }
}

/// A bare file name: no separators, not `.` or `..`.
fn validate_file_name(name: &str) -> Result<(), StorageError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.is_empty() || name.contains(['/', '\\']) || !single_normal {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Depth-first search for a non-directory entry named `name`.
fn find_file(dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if let Some(found) = find_file(&path, name)? {
                return Ok(Some(found));
            }
        } else if entry.file_name() == name {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn to_url_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
