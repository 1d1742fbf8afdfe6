//! Binary sidecar layout (format version 6).
//!
//! The sidecar is header + four contiguous sections:
//!
//! 1. Entries: `entry_count × 40` bytes of fixed-stride records.
//! 2. Paths: NUL-separated UTF-8; segment count equals `entry_count`.
//! 3. Raw data: uncompressed item stream.
//! 4. Gzip data: gzip blob inflating to an item stream of exactly
//!    `gzip_uncompressed_len` bytes.
//!
//! All multi-byte integers are little-endian; the stat fields are IEEE-754
//! 64-bit little-endian. Section offsets are computable from the header
//! alone, giving O(1) addressing without re-scanning earlier sections.

use fshash_common::{Digest, Fingerprint};

/// Sidecar magic: bytes `F`, `S`, `H`, `0x06` read as a little-endian u32.
pub const CACHE_MAGIC: u32 = 0x0648_5346;

/// Header size in bytes (one cache line).
pub const HEADER_LEN: usize = 64;

/// Fixed stride of one cache entry.
pub const ENTRY_LEN: usize = 40;

/// Parsed sidecar header.
///
/// Field layout (offset, size):
///
/// | 0  | 4  | magic                             |
/// | 4  | 3  | user version (u24)                |
/// | 7  | 1  | flags (reserved, must be 0)       |
/// | 8  | 4  | entry count                       |
/// | 12 | 16 | aggregate digest                  |
/// | 28 | 16 | fingerprint                       |
/// | 44 | 4  | paths section length              |
/// | 48 | 4  | raw-data section length           |
/// | 52 | 4  | gzip-data section length on disk  |
/// | 56 | 4  | gzip-data uncompressed length     |
/// | 60 | 2  | raw item count                    |
/// | 62 | 2  | gzip item count                   |
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheHeader {
    /// Caller version, masked to 24 bits.
    pub version: u32,
    /// Number of entries (and path segments).
    pub entry_count: u32,
    /// Aggregate digest recorded at write time.
    pub digest: Digest,
    /// Caller fingerprint for fast rejection.
    pub fingerprint: Fingerprint,
    /// Byte length of the paths section.
    pub paths_len: u32,
    /// Byte length of the raw-data section.
    pub raw_len: u32,
    /// On-disk byte length of the gzip-data section.
    pub gzip_len: u32,
    /// Exact inflated size of the gzip blob.
    pub gzip_uncompressed_len: u32,
    /// Number of items in the raw-data section.
    pub raw_item_count: u16,
    /// Number of items in the gzip-data section.
    pub gzip_item_count: u16,
}

impl CacheHeader {
    /// Serializes the header into its 64-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&CACHE_MAGIC.to_le_bytes());
        buf[4..7].copy_from_slice(&self.version.to_le_bytes()[..3]);
        // Offset 7: flags byte, reserved as zero.
        buf[8..12].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[12..28].copy_from_slice(self.digest.as_bytes());
        buf[28..44].copy_from_slice(self.fingerprint.as_bytes());
        buf[44..48].copy_from_slice(&self.paths_len.to_le_bytes());
        buf[48..52].copy_from_slice(&self.raw_len.to_le_bytes());
        buf[52..56].copy_from_slice(&self.gzip_len.to_le_bytes());
        buf[56..60].copy_from_slice(&self.gzip_uncompressed_len.to_le_bytes());
        buf[60..62].copy_from_slice(&self.raw_item_count.to_le_bytes());
        buf[62..64].copy_from_slice(&self.gzip_item_count.to_le_bytes());
        buf
    }

    /// Parses a header, returning `None` on a short buffer, wrong magic, or
    /// nonzero reserved flags. Version and fingerprint checks are the
    /// caller's concern (they compare against caller-side configuration).
    pub fn parse(buf: &[u8]) -> Option<CacheHeader> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().ok()?);
        if magic != CACHE_MAGIC {
            return None;
        }
        if buf[7] != 0 {
            return None;
        }
        let version = u32::from(buf[4]) | u32::from(buf[5]) << 8 | u32::from(buf[6]) << 16;
        Some(CacheHeader {
            version,
            entry_count: u32::from_le_bytes(buf[8..12].try_into().ok()?),
            digest: Digest::from_slice(&buf[12..28])?,
            fingerprint: Fingerprint::from_raw(buf[28..44].try_into().ok()?),
            paths_len: u32::from_le_bytes(buf[44..48].try_into().ok()?),
            raw_len: u32::from_le_bytes(buf[48..52].try_into().ok()?),
            gzip_len: u32::from_le_bytes(buf[52..56].try_into().ok()?),
            gzip_uncompressed_len: u32::from_le_bytes(buf[56..60].try_into().ok()?),
            raw_item_count: u16::from_le_bytes(buf[60..62].try_into().ok()?),
            gzip_item_count: u16::from_le_bytes(buf[62..64].try_into().ok()?),
        })
    }

    /// Offset of the entries section.
    pub fn entries_offset(&self) -> u64 {
        HEADER_LEN as u64
    }

    /// Offset of the paths section.
    pub fn paths_offset(&self) -> u64 {
        self.entries_offset() + u64::from(self.entry_count) * ENTRY_LEN as u64
    }

    /// Offset of the raw-data section.
    pub fn raw_offset(&self) -> u64 {
        self.paths_offset() + u64::from(self.paths_len)
    }

    /// Offset of the gzip-data section.
    pub fn gzip_offset(&self) -> u64 {
        self.raw_offset() + u64::from(self.raw_len)
    }

    /// Total sidecar size implied by the header fields.
    pub fn total_len(&self) -> u64 {
        self.gzip_offset() + u64::from(self.gzip_len)
    }
}

/// One fixed-stride cache entry: the `stat` identity observed when the hash
/// was computed, plus the hash itself. Entries parallel the path list.
#[derive(Clone, Copy, Debug)]
pub struct CacheEntry {
    /// Inode-equivalent identity number (0 where the platform has none).
    pub ino: f64,
    /// Last modification time, milliseconds since the epoch.
    pub mtime_ms: f64,
    /// File size in bytes.
    pub size: f64,
    /// Per-file content digest.
    pub hash: Digest,
}

impl CacheEntry {
    /// An entry with zeroed identity and hash, recorded for paths whose
    /// `stat` failed.
    pub const EMPTY: CacheEntry = CacheEntry {
        ino: 0.0,
        mtime_ms: 0.0,
        size: 0.0,
        hash: Digest::ZERO,
    };

    /// Serializes the entry into its 40-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; ENTRY_LEN] {
        let mut buf = [0u8; ENTRY_LEN];
        buf[0..8].copy_from_slice(&self.ino.to_le_bytes());
        buf[8..16].copy_from_slice(&self.mtime_ms.to_le_bytes());
        buf[16..24].copy_from_slice(&self.size.to_le_bytes());
        buf[24..40].copy_from_slice(self.hash.as_bytes());
        buf
    }

    /// Deserializes an entry from its 40-byte on-disk form.
    pub fn from_bytes(buf: &[u8; ENTRY_LEN]) -> CacheEntry {
        CacheEntry {
            ino: f64::from_le_bytes(buf[0..8].try_into().expect("8-byte field")),
            mtime_ms: f64::from_le_bytes(buf[8..16].try_into().expect("8-byte field")),
            size: f64::from_le_bytes(buf[16..24].try_into().expect("8-byte field")),
            hash: Digest::from_slice(&buf[24..40]).expect("16-byte field"),
        }
    }
}
