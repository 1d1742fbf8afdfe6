//! Error types for cache operations.

use std::io;
use std::path::PathBuf;

use fshash_engine::EngineError;

/// Errors that can fail a cache operation.
///
/// Reads are fail-safe and never produce these: a corrupt or mismatched
/// sidecar degrades to "no previous cache" and corrupt item streams to empty
/// lists. Only `validate` (engine failures) and `write` can fail.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The gzip compression level was outside 1..=9.
    #[error("gzip level {level} out of range (expected 1-9)")]
    GzipLevel {
        /// The rejected level.
        level: u32,
    },

    /// `write` was called with no validated state.
    #[error("validate() must be called before write()")]
    WriteBeforeValidate,

    /// An item could not be serialized for storage.
    #[error("item not serializable: {reason}")]
    NotSerializable {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A section or item count exceeds what the header fields can record.
    #[error("cache {what} too large for the sidecar format")]
    TooLarge {
        /// The oversized section or count.
        what: &'static str,
    },

    /// An I/O error while writing the sidecar.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The parallel hashing engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_level_display() {
        let err = CacheError::GzipLevel { level: 10 };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("1-9"));
    }

    #[test]
    fn write_before_validate_mentions_validate() {
        assert!(CacheError::WriteBeforeValidate
            .to_string()
            .contains("validate()"));
    }

    #[test]
    fn io_display_names_path() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache.fsh"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("cache.fsh"));
    }
}
