//! Streaming XXH3-128 hashing and the parallel file-hash engine.
//!
//! This crate provides the two hot layers of the change-detection stack:
//! a seeded streaming hasher ([`Xxh3Stream`]) and a work-stealing parallel
//! engine that turns a NUL-separated path list into per-file content digests
//! ([`engine::hash_files`]). The [`bulk`] module layers the aggregate-digest
//! output modes on top.
//!
//! Per-file I/O errors never abort a batch: unreadable files and empty path
//! segments produce all-zero digests, so aggregates stay deterministic.

#![warn(missing_docs)]

pub mod bulk;
pub mod engine;
mod error;
mod file;
pub mod hasher;

pub use bulk::{hash_files_bulk, hash_files_bulk_into, BulkOptions, OutputMode, PathSpec};
pub use error::EngineError;
pub use hasher::{hash, hash_file, Xxh3Stream};
