//! Stable naming for converted artifacts.
//!
//! Every converted page gets a filename of the form
//! `<short-order>-<source-id>-<page>.png`. The three parts come from three
//! small pure components:
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │  order id        │   │  source file     │
//! │ "20250609-fca9…" │   │ "scan_0042.pdf"  │
//! └────────┬─────────┘   └────────┬─────────┘
//!          ▼                      ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ simplify_order_id│   │ derive_source_id │
//! │     "fca939"     │   │    "a1b-42"      │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └──────────┬───────────┘
//!                     ▼
//!           ┌───────────────────┐
//!           │   ArtifactNamer   │
//!           │ "fca939-a1b-42-1" │
//!           └───────────────────┘
//! ```
//!
//! - [`derive_source_id`] / [`derive_nested_source_id`]: short content-based
//!   identifiers, deterministic for identical content and parent chain
//! - [`simplify_order_id`]: shortens caller-supplied grouping keys
//! - [`ArtifactNamer`]: composes final page filenames

mod artifact;
mod order;
mod source_id;

pub use artifact::{artifact_file_name, ArtifactNamer, ARTIFACT_EXTENSION};
pub use order::simplify_order_id;
pub use source_id::{
    derive_nested_source_id, derive_source_id, resolve_source_id, sequence_suffix,
};
