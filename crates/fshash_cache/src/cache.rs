//! Cache manager and per-sidecar cache lifecycle.
//!
//! A [`CacheManager`] holds the immutable configuration shared by every
//! sidecar it opens: the caller's 24-bit version, the aggregate-digest seed,
//! and the fingerprint. A [`Cache`] owns one sidecar file through the
//! `open → validate → write` lifecycle.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::UNIX_EPOCH;

use fshash_common::{pathlist, Digest, Fingerprint, Seed};
use fshash_engine::engine;

use crate::error::CacheError;
use crate::format::{CacheEntry, CacheHeader, ENTRY_LEN, HEADER_LEN};
use crate::items::{self, DataItem};

/// Upper bound on concurrent `stat` lanes during validation.
const STAT_CONCURRENCY: usize = 64;

/// Immutable configuration for a family of sidecar caches.
///
/// The version and fingerprint gate header acceptance on `open`; the seed
/// feeds the aggregate digest. All three are fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct CacheManager {
    version: u32,
    seed: Seed,
    fingerprint: Fingerprint,
}

impl CacheManager {
    /// Creates a manager with the given version (masked to 24 bits) and
    /// aggregate seed. The fingerprint defaults to zero.
    pub fn new(version: u32, seed: Seed) -> Self {
        CacheManager {
            version: version & 0xFF_FFFF,
            seed,
            fingerprint: Fingerprint::ZERO,
        }
    }

    /// Replaces the fingerprint.
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// The 24-bit caller version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The aggregate-digest seed.
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// The fast-reject fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Creates a cache handle for the sidecar at `path`. Nothing is read
    /// until [`Cache::open`].
    pub fn cache(&self, path: impl Into<PathBuf>) -> Cache {
        Cache {
            path: path.into(),
            version: self.version,
            seed: self.seed,
            fingerprint: self.fingerprint,
            file: None,
            header: None,
            old_paths: Vec::new(),
            old_entries: Vec::new(),
            validated: None,
        }
    }
}

/// Result of a [`Cache::validate`] pass.
#[derive(Clone, Copy, Debug)]
pub struct ValidateOutcome {
    /// `true` when the aggregate digest differs from the stored one (or no
    /// valid sidecar was found).
    pub changed: bool,
    /// The freshly computed aggregate digest.
    pub digest: Digest,
    /// Number of files that had to be re-hashed.
    pub rehashed: usize,
}

/// Payload options for [`Cache::write`].
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Items for the uncompressed raw-data section.
    pub raw: Vec<DataItem>,
    /// Items for the gzip-compressed section.
    pub gzip: Vec<DataItem>,
    /// Gzip compression level, 1..=9.
    pub gzip_level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            raw: Vec::new(),
            gzip: Vec::new(),
            gzip_level: 1,
        }
    }
}

/// State captured by a successful `validate`, consumed by `write`.
struct Validated {
    paths: Vec<String>,
    entries: Vec<CacheEntry>,
    digest: Digest,
}

/// `stat` identity of one file, in the sidecar's f64 representation.
#[derive(Clone, Copy)]
struct StatInfo {
    ino: f64,
    mtime_ms: f64,
    size: f64,
}

/// A single sidecar file: reader, validator, and writer.
///
/// All read paths are fail-safe. A missing sidecar, a header whose magic,
/// version, or fingerprint doesn't match, or any truncation is treated as
/// "no previous cache"; the next `validate` then re-hashes everything.
pub struct Cache {
    path: PathBuf,
    version: u32,
    seed: Seed,
    fingerprint: Fingerprint,

    file: Option<File>,
    /// Parsed header of the opened sidecar; present only when it matched
    /// this cache's version and fingerprint.
    header: Option<CacheHeader>,
    old_paths: Vec<String>,
    old_entries: Vec<CacheEntry>,
    validated: Option<Validated>,
}

impl Cache {
    /// Opens the sidecar and loads its entries and paths when the header is
    /// valid. Never fails: a missing or rejected sidecar just leaves this
    /// cache with no previous state.
    pub fn open(&mut self) {
        self.close();
        self.header = None;
        self.old_paths.clear();
        self.old_entries.clear();
        self.validated = None;

        let Ok(mut file) = File::open(&self.path) else {
            return;
        };

        let mut header_buf = [0u8; HEADER_LEN];
        if file.read_exact(&mut header_buf).is_err() {
            return;
        }
        let Some(header) = CacheHeader::parse(&header_buf) else {
            return;
        };
        if header.version != self.version || header.fingerprint != self.fingerprint {
            return;
        }
        // Bound section allocations by what is actually on disk.
        match file.metadata() {
            Ok(md) if md.len() >= header.total_len() => {}
            _ => return,
        }

        let mut entries_buf = vec![0u8; header.entry_count as usize * ENTRY_LEN];
        if file.read_exact(&mut entries_buf).is_err() {
            return;
        }
        let mut paths_buf = vec![0u8; header.paths_len as usize];
        if file.read_exact(&mut paths_buf).is_err() {
            return;
        }

        let paths = pathlist::decode(&paths_buf);
        if paths.len() != header.entry_count as usize {
            return;
        }

        self.old_entries = entries_buf
            .chunks_exact(ENTRY_LEN)
            .map(|chunk| CacheEntry::from_bytes(chunk.try_into().expect("exact chunk")))
            .collect();
        self.old_paths = paths;
        self.header = Some(header);
        self.file = Some(file);
    }

    /// The parsed header of the opened sidecar, if it was valid.
    pub fn header(&self) -> Option<&CacheHeader> {
        self.header.as_ref()
    }

    /// The sidecar path this cache reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file list to validate against: the last validated list if any,
    /// else the list loaded from the opened sidecar, else empty.
    pub fn read_files(&self) -> &[String] {
        match &self.validated {
            Some(v) => &v.paths,
            None => &self.old_paths,
        }
    }

    /// The entries parallel to [`read_files`](Self::read_files): the last
    /// validated entries if any, else those loaded from the opened sidecar.
    pub fn entries(&self) -> &[CacheEntry] {
        match &self.validated {
            Some(v) => &v.entries,
            None => &self.old_entries,
        }
    }

    /// Checks the given files against the opened sidecar, re-hashing only
    /// those whose `stat` identity changed, and computes the new aggregate
    /// digest.
    ///
    /// With `files` omitted the stored file list is revalidated, answering
    /// "did anything change since the last write?". Paths are `stat`ed
    /// concurrently (at most 64 lanes); a path whose identity exactly
    /// matches its stored entry reuses the stored hash without touching the
    /// file's contents.
    pub fn validate(&mut self, files: Option<&[String]>) -> Result<ValidateOutcome, CacheError> {
        let paths: Vec<String> = match files {
            Some(list) => list.to_vec(),
            None => self.read_files().to_vec(),
        };
        let count = paths.len();
        let old_digest = self.header.as_ref().map(|h| h.digest);

        if count == 0 {
            let digest = Digest::of_seeded(&[], self.seed);
            let changed = old_digest != Some(digest);
            self.validated = Some(Validated {
                paths,
                entries: Vec::new(),
                digest,
            });
            return Ok(ValidateOutcome {
                changed,
                digest,
                rehashed: 0,
            });
        }

        let stats = stat_paths(&paths);

        let old_map: HashMap<&str, &CacheEntry> = self
            .old_paths
            .iter()
            .map(String::as_str)
            .zip(self.old_entries.iter())
            .collect();

        // Partition into reusable entries and paths needing a re-hash.
        let mut hashes = vec![0u8; count * Digest::LEN];
        let mut rehash: Vec<usize> = Vec::new();
        for (i, path) in paths.iter().enumerate() {
            let reusable = match (&stats[i], old_map.get(path.as_str())) {
                (Some(stat), Some(entry)) => identity_matches(entry, stat),
                _ => false,
            };
            if reusable {
                let entry = old_map[path.as_str()];
                hashes[i * Digest::LEN..(i + 1) * Digest::LEN]
                    .copy_from_slice(entry.hash.as_bytes());
            } else {
                rehash.push(i);
            }
        }

        if !rehash.is_empty() {
            let subset: Vec<&str> = rehash.iter().map(|&i| paths[i].as_str()).collect();
            let encoded = pathlist::encode(&subset);
            let block = engine::hash_files(&encoded, 0)?;
            for (slot, &i) in rehash.iter().enumerate() {
                hashes[i * Digest::LEN..(i + 1) * Digest::LEN]
                    .copy_from_slice(&block[slot * Digest::LEN..(slot + 1) * Digest::LEN]);
            }
        }

        let digest = Digest::of_seeded(&hashes, self.seed);
        let entries: Vec<CacheEntry> = paths
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let hash = Digest::from_slice(&hashes[i * Digest::LEN..(i + 1) * Digest::LEN])
                    .expect("16-byte slot");
                match &stats[i] {
                    Some(stat) => CacheEntry {
                        ino: stat.ino,
                        mtime_ms: stat.mtime_ms,
                        size: stat.size,
                        hash,
                    },
                    None => CacheEntry { hash, ..CacheEntry::EMPTY },
                }
            })
            .collect();

        let changed = old_digest != Some(digest);
        let rehashed = rehash.len();
        self.validated = Some(Validated {
            paths,
            entries,
            digest,
        });

        Ok(ValidateOutcome {
            changed,
            digest,
            rehashed,
        })
    }

    /// Items from the raw-data section, or empty when there is no valid
    /// sidecar, the section is empty, or the stream is corrupt.
    pub fn read_raw_data(&mut self) -> Vec<DataItem> {
        self.read_items_section(false).unwrap_or_default()
    }

    /// Items from the gzip-data section, decompressed with the exact-size
    /// bound from the header. Empty on any failure.
    pub fn read_gzip_data(&mut self) -> Vec<DataItem> {
        self.read_items_section(true).unwrap_or_default()
    }

    fn read_items_section(&mut self, gzip: bool) -> Option<Vec<DataItem>> {
        let header = self.header.as_ref()?;
        let (offset, len, expected_items) = if gzip {
            (header.gzip_offset(), header.gzip_len, header.gzip_item_count)
        } else {
            (header.raw_offset(), header.raw_len, header.raw_item_count)
        };
        if len == 0 {
            return (expected_items == 0).then(Vec::new);
        }

        let file = self.file.as_mut()?;
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).ok()?;

        let plain = if gzip {
            items::gzip_decompress(&buf, header.gzip_uncompressed_len as usize)?
        } else {
            buf
        };
        let parsed = items::parse_items(&plain).ok()?;
        (parsed.len() == usize::from(expected_items)).then_some(parsed)
    }

    /// Serializes the validated state and caller payloads into a fresh
    /// sidecar, published atomically via a temp file and rename. Parent
    /// directories are created as needed.
    pub fn write(&mut self, opts: &WriteOptions) -> Result<(), CacheError> {
        let validated = self.validated.as_ref().ok_or(CacheError::WriteBeforeValidate)?;
        if !(1..=9).contains(&opts.gzip_level) {
            return Err(CacheError::GzipLevel {
                level: opts.gzip_level,
            });
        }

        let raw_data = items::serialize_items(&opts.raw)?;
        let gzip_plain = items::serialize_items(&opts.gzip)?;
        let gzip_data = if gzip_plain.is_empty() {
            Vec::new()
        } else {
            items::gzip_compress(&gzip_plain, opts.gzip_level).map_err(|source| {
                CacheError::Io {
                    path: self.path.clone(),
                    source,
                }
            })?
        };
        let paths_data = pathlist::encode(&validated.paths);

        let header = CacheHeader {
            version: self.version,
            entry_count: section_len(validated.entries.len(), "entry count")?,
            digest: validated.digest,
            fingerprint: self.fingerprint,
            paths_len: section_len(paths_data.len(), "paths section")?,
            raw_len: section_len(raw_data.len(), "raw-data section")?,
            gzip_len: section_len(gzip_data.len(), "gzip-data section")?,
            gzip_uncompressed_len: section_len(gzip_plain.len(), "gzip-data section")?,
            raw_item_count: item_count(opts.raw.len(), "raw item count")?,
            gzip_item_count: item_count(opts.gzip.len(), "gzip item count")?,
        };

        let mut out = Vec::with_capacity(header.total_len() as usize);
        out.extend_from_slice(&header.to_bytes());
        for entry in &validated.entries {
            out.extend_from_slice(&entry.to_bytes());
        }
        out.extend_from_slice(&paths_data);
        out.extend_from_slice(&raw_data);
        out.extend_from_slice(&gzip_data);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let tmp = PathBuf::from(format!(
            "{}.tmp-{}",
            self.path.display(),
            std::process::id()
        ));
        fs::write(&tmp, &out).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Io {
                path: self.path.clone(),
                source,
            });
        }

        // The sidecar on disk now matches the validated state; refresh the
        // loaded view so a subsequent validate sees it without reopening.
        self.old_paths = validated.paths.clone();
        self.old_entries = validated.entries.clone();
        self.header = Some(header);
        self.file = File::open(&self.path).ok();
        Ok(())
    }

    /// Releases the sidecar file handle. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
    }
}

/// Converts a section length for a u32 header field.
fn section_len(len: usize, what: &'static str) -> Result<u32, CacheError> {
    u32::try_from(len).map_err(|_| CacheError::TooLarge { what })
}

/// Converts an item count for a u16 header field.
fn item_count(count: usize, what: &'static str) -> Result<u16, CacheError> {
    u16::try_from(count).map_err(|_| CacheError::TooLarge { what })
}

/// Exact identity comparison between a stored entry and a fresh `stat`.
/// Bit-level f64 equality: the stored values round-trip through the sidecar
/// unchanged, so an unchanged file reproduces them exactly.
fn identity_matches(entry: &CacheEntry, stat: &StatInfo) -> bool {
    entry.ino.to_bits() == stat.ino.to_bits()
        && entry.mtime_ms.to_bits() == stat.mtime_ms.to_bits()
        && entry.size.to_bits() == stat.size.to_bits()
}

/// `stat`s every path, at most [`STAT_CONCURRENCY`] lanes at a time,
/// returning results in input order. Failed `stat`s are `None`.
fn stat_paths(paths: &[String]) -> Vec<Option<StatInfo>> {
    let count = paths.len();
    let mut results: Vec<Option<StatInfo>> = vec![None; count];

    let lanes = count.min(STAT_CONCURRENCY);
    if lanes <= 1 {
        for (i, path) in paths.iter().enumerate() {
            results[i] = stat_one(path);
        }
        return results;
    }

    let next = AtomicUsize::new(0);
    thread::scope(|s| {
        let handles: Vec<_> = (0..lanes)
            .map(|_| {
                let next = &next;
                s.spawn(move || {
                    let mut found = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        if i >= count {
                            break;
                        }
                        if let Some(stat) = stat_one(&paths[i]) {
                            found.push((i, stat));
                        }
                    }
                    found
                })
            })
            .collect();
        for handle in handles {
            // A panicked lane degrades its claims to stat failures, forcing
            // a re-hash instead of aborting the validation.
            for (i, stat) in handle.join().unwrap_or_default() {
                results[i] = Some(stat);
            }
        }
    });
    results
}

fn stat_one(path: &str) -> Option<StatInfo> {
    if path.is_empty() {
        return None;
    }
    let md = fs::metadata(path).ok()?;
    let modified = md.modified().ok()?;
    let mtime_ms = match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64() * 1000.0,
        Err(before) => -(before.duration().as_secs_f64() * 1000.0),
    };
    Some(StatInfo {
        ino: inode(&md) as f64,
        mtime_ms,
        size: md.len() as f64,
    })
}

#[cfg(unix)]
fn inode(md: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    md.ino()
}

#[cfg(not(unix))]
fn inode(_md: &fs::Metadata) -> u64 {
    0
}
