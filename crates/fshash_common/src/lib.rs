//! Shared foundational types for the fshash change-detection engine.
//!
//! This crate provides the canonical 128-bit digest type, hash seeds, cache
//! fingerprints, the NUL-separated path-list codec, and backend status
//! reporting used by the engine and cache crates.

#![warn(missing_docs)]

pub mod backend;
pub mod digest;
pub mod fingerprint;
pub mod pathlist;

pub use backend::LibraryStatus;
pub use digest::{Digest, Seed};
pub use fingerprint::Fingerprint;
