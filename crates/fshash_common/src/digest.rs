//! Content digests for change detection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit XXH3 content digest in canonical (big-endian) byte order.
///
/// Two inputs with the same `Digest` are assumed to have identical content.
/// Digests are compared only as byte sequences, never as numeric values;
/// the canonical form is the big-endian serialization of the 128-bit hash,
/// so on-disk bytes sort and compare the same way on every platform.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 16]);

impl Digest {
    /// The all-zero digest recorded for unreadable files and empty path
    /// segments. Never produced by hashing actual content.
    pub const ZERO: Digest = Digest([0u8; 16]);

    /// Number of bytes in a serialized digest.
    pub const LEN: usize = 16;

    /// Builds a digest from a raw 128-bit hash value.
    pub fn from_value(value: u128) -> Self {
        Digest(value.to_be_bytes())
    }

    /// Builds a digest from its canonical byte representation.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Digest(bytes)
    }

    /// Builds a digest from a 16-byte slice, or `None` when the length is wrong.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Digest)
    }

    /// Computes the digest of a byte slice using XXH3-128 with seed 0.
    pub fn of(data: &[u8]) -> Self {
        Digest::from_value(xxhash_rust::xxh3::xxh3_128(data))
    }

    /// Computes the digest of a byte slice using XXH3-128 with the given seed.
    pub fn of_seeded(data: &[u8], seed: Seed) -> Self {
        Digest::from_value(xxhash_rust::xxh3::xxh3_128_with_seed(data, seed.value()))
    }

    /// Returns the canonical bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns `true` for the all-zero digest.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A 64-bit hash seed, assembled from two 32-bit halves.
///
/// The external surface takes seeds as `(low, high)` pairs; the full value
/// is `(high << 32) | low`. The default seed is zero. A hasher's seed is
/// fixed at construction and survives `reset`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Seed(u64);

impl Seed {
    /// The default zero seed.
    pub const ZERO: Seed = Seed(0);

    /// Assembles a seed from its low and high 32-bit halves.
    pub fn from_parts(low: u32, high: u32) -> Self {
        Seed((u64::from(high) << 32) | u64::from(low))
    }

    /// Wraps a full 64-bit seed value.
    pub fn from_value(value: u64) -> Self {
        Seed(value)
    }

    /// Returns the 64-bit seed value.
    pub fn value(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = Digest::of(b"hello world");
        let b = Digest::of(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(Digest::of(b"hello"), Digest::of(b"world"));
    }

    #[test]
    fn known_vectors_seed_zero() {
        assert_eq!(
            Digest::of(b"").to_string(),
            "99aa06d3014798d86001c324468d497f"
        );
        assert_eq!(
            Digest::of(b"hello world").to_string(),
            "df8d09e93f874900a99b8775cc15b6c7"
        );
        assert_eq!(
            Digest::of(b"hello").to_string(),
            "b5e9c1ad071b3e7fc779cfaa5e523818"
        );
        assert_eq!(
            Digest::of(b"hello world\n").to_string(),
            "eefac9d87100cd1336b2e733a5484425"
        );
        assert_eq!(
            Digest::of(b"goodbye world\n").to_string(),
            "472e10c9821c728278f31afb08378f2f"
        );
    }

    #[test]
    fn known_vectors_seeded() {
        let all_ones = Seed::from_parts(0xFFFF_FFFF, 0xFFFF_FFFF);
        assert_eq!(
            Digest::of_seeded(b"test", all_ones).to_string(),
            "6cc7cd132e2ff1eeac22e8e10a24ee1d"
        );
        let mixed = Seed::from_parts(42, 99);
        assert_eq!(
            Digest::of_seeded(b"hello world", mixed).to_string(),
            "fa02c118551d9e0e2765c10f89392d8e"
        );
    }

    #[test]
    fn seeded_differs_from_unseeded() {
        let seeded = Digest::of_seeded(b"payload", Seed::from_parts(1, 0));
        assert_ne!(seeded, Digest::of(b"payload"));
    }

    #[test]
    fn seed_assembly() {
        assert_eq!(Seed::from_parts(0, 0).value(), 0);
        assert_eq!(Seed::from_parts(42, 0).value(), 42);
        assert_eq!(Seed::from_parts(0, 1).value(), 1 << 32);
        assert_eq!(
            Seed::from_parts(0xDEAD_BEEF, 0xCAFE_BABE).value(),
            0xCAFE_BABE_DEAD_BEEF
        );
    }

    #[test]
    fn zero_digest() {
        assert!(Digest::ZERO.is_zero());
        assert!(!Digest::of(b"").is_zero());
        assert_eq!(Digest::ZERO.to_string(), "00000000000000000000000000000000");
    }

    #[test]
    fn byte_roundtrip() {
        let d = Digest::of(b"roundtrip");
        assert_eq!(Digest::from_bytes(*d.as_bytes()), d);
        assert_eq!(Digest::from_slice(d.as_bytes()), Some(d));
        assert_eq!(Digest::from_slice(&d.as_bytes()[..15]), None);
    }

    #[test]
    fn display_format() {
        let s = Digest::of(b"test").to_string();
        assert_eq!(s.len(), 32, "Display should be 32 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_abbreviated() {
        let s = format!("{:?}", Digest::of(b"test"));
        assert!(s.starts_with("Digest("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn serde_roundtrip() {
        let d = Digest::of(b"serde test");
        let json = serde_json::to_string(&d).unwrap();
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
