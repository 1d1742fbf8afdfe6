//! Error types for the hashing engine.

use std::io;
use std::path::PathBuf;

/// Errors that can abort an engine operation.
///
/// Per-file open/read failures are not represented here: they degrade to
/// all-zero digests inside the parallel engine so one unreadable file never
/// kills a batch.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An output span was too small for the requested operation.
    #[error("{what}: output buffer too small (need {needed} bytes at offset {offset}, have {available})")]
    Range {
        /// The operation that was attempted.
        what: &'static str,
        /// Bytes required starting at `offset`.
        needed: usize,
        /// Offset into the output buffer.
        offset: usize,
        /// Total length of the output buffer.
        available: usize,
    },

    /// The per-thread read-buffer slab or the result buffer could not be
    /// allocated.
    #[error("failed to allocate {bytes} bytes for hashing buffers")]
    OutOfMemory {
        /// Size of the failed allocation.
        bytes: usize,
    },

    /// An I/O error on a single named file, from operations that target
    /// exactly one file and therefore cannot degrade to a zero hash.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_display_names_operation() {
        let err = EngineError::Range {
            what: "digest_to",
            needed: 16,
            offset: 8,
            available: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("digest_to"));
        assert!(msg.contains("too small"));
    }

    #[test]
    fn io_display_names_path() {
        let err = EngineError::Io {
            path: PathBuf::from("/data/input.bin"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("input.bin"));
    }
}
