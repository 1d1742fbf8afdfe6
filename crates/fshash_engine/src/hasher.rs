//! Seeded streaming XXH3-128 hasher.

use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

use fshash_common::{Digest, Seed};

use crate::bulk::PathSpec;
use crate::engine;
use crate::error::EngineError;
use crate::file::FileHandle;

/// Computes the XXH3-128 digest of `data` in one shot.
pub fn hash(data: &[u8], seed: Seed) -> Digest {
    Digest::of_seeded(data, seed)
}

/// Hashes a single file's raw contents (XXH3-128, seed 0).
///
/// Convenience for callers outside the batch path; I/O failures surface as
/// errors because exactly one named file is involved.
pub fn hash_file(path: &Path) -> Result<Digest, EngineError> {
    let mut stream = Xxh3Stream::default();
    stream.update_file(path)?;
    Ok(stream.digest())
}

/// A streaming XXH3-128 hasher with a construction-time seed.
///
/// The seed is fixed for the lifetime of the hasher; [`reset`](Self::reset)
/// returns to the freshly-seeded state. [`digest`](Self::digest) does not
/// consume or mutate the state, so interim digests can be taken at any point.
///
/// Beyond plain byte updates, the hasher can fold whole files into its state:
/// [`update_file`](Self::update_file) streams one file's raw bytes, and the
/// `update_files_*` family hashes a path list in parallel (per-file XXH3-128,
/// seed 0) and feeds the concatenated per-file digest block into the stream.
/// That two-level scheme keeps file hashing parallel while the aggregate
/// stays deterministic, and lets callers mix file content with other data in
/// a single digest.
pub struct Xxh3Stream {
    state: Xxh3,
    seed: Seed,
}

impl Xxh3Stream {
    /// Creates a hasher with the given seed.
    pub fn new(seed: Seed) -> Self {
        Xxh3Stream {
            state: Xxh3::with_seed(seed.value()),
            seed,
        }
    }

    /// Returns the construction-time seed.
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Resets to the freshly-seeded state.
    pub fn reset(&mut self) {
        self.state = Xxh3::with_seed(self.seed.value());
    }

    /// Feeds `data` into the stream. An empty slice is a no-op.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Returns the current digest without mutating the state.
    pub fn digest(&self) -> Digest {
        Digest::from_value(self.state.digest128())
    }

    /// Writes the current digest into `out` at `offset`.
    pub fn digest_to(&self, out: &mut [u8], offset: usize) -> Result<(), EngineError> {
        if offset.checked_add(Digest::LEN).map_or(true, |end| end > out.len()) {
            return Err(EngineError::Range {
                what: "digest_to",
                needed: Digest::LEN,
                offset,
                available: out.len(),
            });
        }
        out[offset..offset + Digest::LEN].copy_from_slice(self.digest().as_bytes());
        Ok(())
    }

    /// Streams a single file's raw bytes into the state.
    ///
    /// Unlike the parallel engine, this targets one named file, so I/O
    /// failures surface as errors instead of degrading to a zero hash.
    pub fn update_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let io_err = |source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = FileHandle::open(path).map_err(io_err)?;
        let mut buf = vec![0u8; engine::READ_BUFFER_SIZE];
        loop {
            match file.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => self.state.update(&buf[..n]),
                Err(e) => return Err(io_err(e)),
            }
        }
    }

    /// Hashes all files in parallel, feeds the per-file digest block into the
    /// stream, and returns the block.
    pub fn update_files_bulk(
        &mut self,
        paths: &PathSpec<'_>,
        concurrency: usize,
    ) -> Result<Vec<u8>, EngineError> {
        let encoded = paths.encoded();
        let block = engine::hash_files(&encoded, concurrency)?;
        self.state.update(&block);
        Ok(block)
    }

    /// Like [`update_files_bulk`](Self::update_files_bulk), writing the block
    /// into `out` at `offset`. Returns the number of bytes written.
    pub fn update_files_bulk_into(
        &mut self,
        paths: &PathSpec<'_>,
        concurrency: usize,
        out: &mut [u8],
        offset: usize,
    ) -> Result<usize, EngineError> {
        let encoded = paths.encoded();
        let written = engine::hash_files_into(&encoded, concurrency, out, offset)?;
        self.state.update(&out[offset..offset + written]);
        Ok(written)
    }

    /// Hashes all files in parallel and feeds the per-file digest block into
    /// the stream, discarding the block.
    pub fn update_files_aggregate(
        &mut self,
        paths: &PathSpec<'_>,
        concurrency: usize,
    ) -> Result<(), EngineError> {
        self.update_files_bulk(paths, concurrency)?;
        Ok(())
    }
}

impl Default for Xxh3Stream {
    fn default() -> Self {
        Xxh3Stream::new(Seed::ZERO)
    }
}
