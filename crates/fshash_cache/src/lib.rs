//! Persistent file-hash cache.
//!
//! A compact binary sidecar records per-file content digests together with
//! the `stat` identity (`ino`, `mtime`, `size`) observed when they were
//! computed. Re-validating a file list then costs one disk read for the
//! sidecar plus one `stat` per file; only files whose identity changed are
//! re-hashed. The sidecar also carries opaque caller payloads in raw and
//! gzip-compressed item sections.
//!
//! All reads are fail-safe: a missing, truncated, or mismatched sidecar
//! degrades to "no previous cache" and forces a full re-hash rather than an
//! error.

#![warn(missing_docs)]

pub mod cache;
mod error;
pub mod format;
pub mod items;

pub use cache::{Cache, CacheManager, ValidateOutcome, WriteOptions};
pub use error::CacheError;
pub use format::{CacheEntry, CacheHeader};
pub use items::DataItem;
