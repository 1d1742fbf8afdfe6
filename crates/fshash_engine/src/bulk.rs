//! Bulk file hashing with aggregate-digest output modes.
//!
//! The façade over the parallel engine: hash a file list, optionally compute
//! the seeded aggregate digest over the concatenated per-file digests, and
//! lay the result out in one of three shapes. Per-file digests always use
//! seed 0; only the aggregate takes the caller's seed.

use std::borrow::Cow;

use fshash_common::{pathlist, Digest, Seed};

use crate::engine;
use crate::error::EngineError;

/// File list input: either decoded paths or a pre-encoded NUL-separated
/// buffer (see [`fshash_common::pathlist`]).
pub enum PathSpec<'a> {
    /// A slice of path strings, encoded on demand.
    Paths(&'a [String]),
    /// An already-encoded NUL-separated buffer, used as-is.
    Encoded(&'a [u8]),
}

impl<'a> PathSpec<'a> {
    /// Returns the NUL-separated encoding, borrowing when already encoded.
    pub fn encoded(&self) -> Cow<'a, [u8]> {
        match self {
            PathSpec::Paths(paths) => Cow::Owned(pathlist::encode(paths)),
            PathSpec::Encoded(buf) => Cow::Borrowed(buf),
        }
    }
}

/// Result layout for [`hash_files_bulk`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// The 16-byte aggregate digest only.
    #[default]
    Digest,
    /// The `N × 16` bytes of per-file digests.
    Files,
    /// Aggregate digest followed by the per-file digests (`16 + N × 16`
    /// bytes). With zero files this degenerates to the aggregate alone.
    All,
}

/// Options for a bulk hash operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct BulkOptions {
    /// Result layout. Defaults to [`OutputMode::Digest`].
    pub mode: OutputMode,
    /// Thread-count hint; 0 selects the hardware default.
    pub concurrency: usize,
    /// Seed for the aggregate digest. Per-file digests always use seed 0.
    pub seed: Seed,
}

/// Hashes all files and returns the result in the layout selected by
/// `opts.mode`. The returned buffer is owned by the caller.
pub fn hash_files_bulk(paths: &PathSpec<'_>, opts: &BulkOptions) -> Result<Vec<u8>, EngineError> {
    let encoded = paths.encoded();
    match opts.mode {
        OutputMode::Digest => {
            let block = engine::hash_files(&encoded, opts.concurrency)?;
            Ok(Digest::of_seeded(&block, opts.seed).as_bytes().to_vec())
        }
        OutputMode::Files => engine::hash_files(&encoded, opts.concurrency),
        OutputMode::All => {
            let count = pathlist::count(&encoded);
            if count == 0 {
                return Ok(Digest::of_seeded(&[], opts.seed).as_bytes().to_vec());
            }
            let bytes = Digest::LEN + count * Digest::LEN;
            let mut out = Vec::new();
            out.try_reserve_exact(bytes)
                .map_err(|_| EngineError::OutOfMemory { bytes })?;
            out.resize(bytes, 0);
            engine::hash_files_into(&encoded, opts.concurrency, &mut out, Digest::LEN)?;
            let aggregate = Digest::of_seeded(&out[Digest::LEN..], opts.seed);
            out[..Digest::LEN].copy_from_slice(aggregate.as_bytes());
            Ok(out)
        }
    }
}

/// Like [`hash_files_bulk`], writing the result into `out` at `offset`.
/// Returns the number of bytes written.
pub fn hash_files_bulk_into(
    paths: &PathSpec<'_>,
    opts: &BulkOptions,
    out: &mut [u8],
    offset: usize,
) -> Result<usize, EngineError> {
    let encoded = paths.encoded();
    let count = pathlist::count(&encoded);
    let needed = output_len(opts.mode, count);
    if offset.checked_add(needed).map_or(true, |end| end > out.len()) {
        return Err(EngineError::Range {
            what: "hash_files_bulk_into",
            needed,
            offset,
            available: out.len(),
        });
    }

    match opts.mode {
        OutputMode::Digest => {
            let block = engine::hash_files(&encoded, opts.concurrency)?;
            let aggregate = Digest::of_seeded(&block, opts.seed);
            out[offset..offset + Digest::LEN].copy_from_slice(aggregate.as_bytes());
        }
        OutputMode::Files => {
            engine::hash_files_into(&encoded, opts.concurrency, out, offset)?;
        }
        OutputMode::All => {
            if count == 0 {
                let aggregate = Digest::of_seeded(&[], opts.seed);
                out[offset..offset + Digest::LEN].copy_from_slice(aggregate.as_bytes());
            } else {
                engine::hash_files_into(&encoded, opts.concurrency, out, offset + Digest::LEN)?;
                let aggregate =
                    Digest::of_seeded(&out[offset + Digest::LEN..offset + needed], opts.seed);
                out[offset..offset + Digest::LEN].copy_from_slice(aggregate.as_bytes());
            }
        }
    }
    Ok(needed)
}

/// Number of result bytes for `mode` over `count` files.
fn output_len(mode: OutputMode, count: usize) -> usize {
    match mode {
        OutputMode::Digest => Digest::LEN,
        OutputMode::Files => count * Digest::LEN,
        OutputMode::All => {
            if count == 0 {
                Digest::LEN
            } else {
                Digest::LEN + count * Digest::LEN
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixture(dir: &Path) -> (String, String) {
        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        std::fs::write(&a, b"hello world\n").unwrap();
        std::fs::write(&b, b"goodbye world\n").unwrap();
        (
            a.to_str().unwrap().to_string(),
            b.to_str().unwrap().to_string(),
        )
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn digest_mode_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];

        let out = hash_files_bulk(&PathSpec::Paths(&paths), &BulkOptions::default()).unwrap();
        assert_eq!(hex(&out), "14cb7b529dbb3358999291d5315f9ec8");
    }

    #[test]
    fn digest_depends_on_order() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let reversed = vec![b, a];

        let out = hash_files_bulk(&PathSpec::Paths(&reversed), &BulkOptions::default()).unwrap();
        assert_eq!(hex(&out), "b96712ebc4252558f427015fab836b59");
    }

    #[test]
    fn all_mode_with_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = fixture(dir.path());
        let paths = vec![a, "/no/such".to_string()];

        let opts = BulkOptions {
            mode: OutputMode::All,
            ..BulkOptions::default()
        };
        let out = hash_files_bulk(&PathSpec::Paths(&paths), &opts).unwrap();
        assert_eq!(out.len(), 48);
        assert_eq!(hex(&out[..16]), "3bd4a3acde4c43af41d10b55b7dcc098");
        assert_eq!(hex(&out[16..32]), "eefac9d87100cd1336b2e733a5484425");
        assert_eq!(&out[32..], &[0u8; 16]);
    }

    #[test]
    fn empty_input_layouts() {
        let empty: Vec<String> = Vec::new();
        let spec = PathSpec::Paths(&empty);

        let digest = hash_files_bulk(&spec, &BulkOptions::default()).unwrap();
        assert_eq!(digest.len(), 16);
        assert_eq!(digest, Digest::of(b"").as_bytes());

        let files = hash_files_bulk(
            &spec,
            &BulkOptions {
                mode: OutputMode::Files,
                ..BulkOptions::default()
            },
        )
        .unwrap();
        assert!(files.is_empty());

        let all = hash_files_bulk(
            &spec,
            &BulkOptions {
                mode: OutputMode::All,
                ..BulkOptions::default()
            },
        )
        .unwrap();
        assert_eq!(all, digest);
    }

    #[test]
    fn empty_input_seeded_digest_is_not_zero() {
        let empty: Vec<String> = Vec::new();
        let seed = Seed::from_parts(5, 6);
        let out = hash_files_bulk(
            &PathSpec::Paths(&empty),
            &BulkOptions {
                seed,
                ..BulkOptions::default()
            },
        )
        .unwrap();
        assert_eq!(out, Digest::of_seeded(b"", seed).as_bytes());
        assert_ne!(out, vec![0u8; 16]);
    }

    #[test]
    fn files_mode_matches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];

        let opts = BulkOptions {
            mode: OutputMode::Files,
            ..BulkOptions::default()
        };
        let out = hash_files_bulk(&PathSpec::Paths(&paths), &opts).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..16], Digest::of(b"hello world\n").as_bytes());
        assert_eq!(&out[16..], Digest::of(b"goodbye world\n").as_bytes());
    }

    #[test]
    fn encoded_input_matches_paths_input() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];
        let encoded = pathlist::encode(&paths);

        let from_paths =
            hash_files_bulk(&PathSpec::Paths(&paths), &BulkOptions::default()).unwrap();
        let from_encoded =
            hash_files_bulk(&PathSpec::Encoded(&encoded), &BulkOptions::default()).unwrap();
        assert_eq!(from_paths, from_encoded);
    }

    #[test]
    fn seeded_aggregate_differs() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];

        let unseeded =
            hash_files_bulk(&PathSpec::Paths(&paths), &BulkOptions::default()).unwrap();
        let seeded = hash_files_bulk(
            &PathSpec::Paths(&paths),
            &BulkOptions {
                seed: Seed::from_parts(1, 2),
                ..BulkOptions::default()
            },
        )
        .unwrap();
        assert_ne!(unseeded, seeded);
    }

    #[test]
    fn into_variant_matches_owned() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];

        for mode in [OutputMode::Digest, OutputMode::Files, OutputMode::All] {
            let opts = BulkOptions {
                mode,
                ..BulkOptions::default()
            };
            let owned = hash_files_bulk(&PathSpec::Paths(&paths), &opts).unwrap();
            let mut out = vec![0u8; owned.len() + 8];
            let written =
                hash_files_bulk_into(&PathSpec::Paths(&paths), &opts, &mut out, 8).unwrap();
            assert_eq!(written, owned.len(), "{mode:?}");
            assert_eq!(&out[8..8 + written], &owned[..], "{mode:?}");
        }
    }

    #[test]
    fn into_variant_rejects_short_buffer() {
        let paths = vec!["x".to_string()];
        let mut out = vec![0u8; 15];
        let err = hash_files_bulk_into(
            &PathSpec::Paths(&paths),
            &BulkOptions::default(),
            &mut out,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Range { .. }));
    }

    #[test]
    fn concurrency_does_not_change_result() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = fixture(dir.path());
        let paths = vec![a, b];

        let serial = hash_files_bulk(
            &PathSpec::Paths(&paths),
            &BulkOptions {
                concurrency: 1,
                ..BulkOptions::default()
            },
        )
        .unwrap();
        let parallel = hash_files_bulk(
            &PathSpec::Paths(&paths),
            &BulkOptions {
                concurrency: 8,
                ..BulkOptions::default()
            },
        )
        .unwrap();
        assert_eq!(serial, parallel);
    }
}
