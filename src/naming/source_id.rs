//! Source identifier derivation.
//!
//! A source identifier is a short token naming one input document:
//!
//! - `"a1b2c3"`: first 6 hex characters of a SHA-256 digest
//! - `"a1b-42"`: first 3 hex characters joined to a sequence number taken from
//!   a `_0042`-style filename suffix, so near-identical files in a numbered
//!   batch stay distinguishable
//!
//! Identifiers are truncated hashes and can collide. That is accepted in
//! exchange for short, readable filenames.
//!
//! When the file cannot be read, a weaker path-based digest is used instead.
//! Its field order (path, stem, stem length, last `_` segment, parent id) is
//! part of the naming contract for files already on disk and must not change.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Matches `_0042` (or `_0042.`) and captures the unpadded `42`.
static SEQUENCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_0*(\d+)($|\.)").expect("sequence regex is valid"));

/// Hex characters kept for a plain identifier.
const ID_LEN: usize = 6;

/// Hex characters kept when a sequence number is appended.
const SEQUENCED_ID_LEN: usize = 3;

/// Extract the sequence number from a filename stem.
///
/// Returns the digits after an underscore and any leading zeros, when they sit
/// at the end of the stem or before a dot: `"doc_0042"` → `Some("42")`,
/// `"scan_0000"` → `Some("0")`, `"report"` → `None`.
pub fn sequence_suffix(stem: &str) -> Option<&str> {
    SEQUENCE_SUFFIX
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|seq| !seq.is_empty())
}

/// Use the caller's identifier when given, otherwise derive one from the file.
pub fn resolve_source_id(explicit: Option<&str>, path: &Path, parent_id: Option<&str>) -> String {
    match explicit.filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => derive_source_id(path, parent_id),
    }
}

/// Derive a source identifier for a file on disk.
///
/// The digest covers the full file content only. If a sequence suffix is
/// present in the filename stem the result is `"<3 hex>-<seq>"`, otherwise the
/// first 6 hex characters.
///
/// If the file cannot be read, falls back to [`path_fallback_id`], which also
/// mixes in `parent_id`.
pub fn derive_source_id(path: &Path, parent_id: Option<&str>) -> String {
    let path_str = path.to_string_lossy();
    let stem = file_stem(&path_str);

    match hash_file(path) {
        Ok(digest) => {
            let id = match sequence_suffix(stem) {
                Some(seq) => sequenced(&digest, seq),
                None => digest[..ID_LEN].to_string(),
            };
            debug!(path = %path.display(), source_id = %id, "Derived source id from content");
            id
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Cannot hash file content, falling back to path-based source id"
            );
            path_fallback_id(&path_str, parent_id)
        }
    }
}

/// Derive a source identifier for a document extracted from an archive.
///
/// With content available, the digest covers the content followed by
/// `parent_id`, and the sequence rule applies to the inner path's stem.
/// Without content, the digest covers the archive path, the inner path, the
/// inner stem's last `_` segment and `parent_id`.
pub fn derive_nested_source_id(
    archive_path: &str,
    inner_path: &str,
    content: &[u8],
    parent_id: Option<&str>,
) -> String {
    let parent_id = parent_id.filter(|id| !id.is_empty());
    let stem = file_stem(inner_path);

    if !content.is_empty() {
        let mut hasher = Sha256::new();
        hasher.update(content);
        if let Some(parent) = parent_id {
            hasher.update(parent.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        return match sequence_suffix(stem) {
            Some(seq) => sequenced(&digest, seq),
            None => digest[..ID_LEN].to_string(),
        };
    }

    let mut hasher = Sha256::new();
    hasher.update(archive_path.as_bytes());
    hasher.update(inner_path.as_bytes());

    let segment = last_underscore_segment(stem);
    if let Some(seg) = segment {
        hasher.update(seg.as_bytes());
    }
    if let Some(parent) = parent_id {
        hasher.update(parent.as_bytes());
    }

    finish_fallback(hasher, segment)
}

/// Best-effort identifier for a file whose content cannot be read.
///
/// Digest input, in order: full path, stem, decimal stem length in bytes,
/// the stem's last `_` segment (when the stem contains `_`), parent id.
fn path_fallback_id(path: &str, parent_id: Option<&str>) -> String {
    let stem = file_stem(path);

    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(stem.as_bytes());
    hasher.update(stem.len().to_string().as_bytes());

    let segment = last_underscore_segment(stem);
    if let Some(seg) = segment {
        hasher.update(seg.as_bytes());
    }
    if let Some(parent) = parent_id.filter(|id| !id.is_empty()) {
        hasher.update(parent.as_bytes());
    }

    finish_fallback(hasher, segment)
}

fn finish_fallback(hasher: Sha256, segment: Option<&str>) -> String {
    let digest = hex::encode(hasher.finalize());
    match segment.filter(|seg| !seg.is_empty()) {
        Some(seg) => sequenced(&digest, seg),
        None => digest[..ID_LEN].to_string(),
    }
}

fn sequenced(digest: &str, seq: &str) -> String {
    format!("{}-{}", &digest[..SEQUENCED_ID_LEN], seq)
}

fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Final path component without its extension.
///
/// The extension starts at the last dot of the final component, so
/// `"a/b.tar.gz"` → `"b.tar"` and `".hidden"` → `""`.
fn file_stem(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match base.rfind('.') {
        Some(idx) => &base[..idx],
        None => base,
    }
}

/// The text after the last `_`, when the stem contains one.
fn last_underscore_segment(stem: &str) -> Option<&str> {
    stem.rsplit_once('_').map(|(_, last)| last)
}
