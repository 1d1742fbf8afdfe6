//! Cache fingerprints for fast rejection of incompatible sidecars.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::Digest;

/// A 16-byte cache-rejection key stored in the sidecar header.
///
/// A sidecar whose fingerprint does not match the caller's is treated as
/// absent, forcing a full re-hash. The fingerprint participates only in this
/// header comparison; it is never mixed into any content digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// The all-zero fingerprint used when the caller supplies none.
    pub const ZERO: Fingerprint = Fingerprint([0u8; 16]);

    /// Uses the given 16 bytes verbatim.
    pub fn from_raw(bytes: [u8; 16]) -> Self {
        Fingerprint(bytes)
    }

    /// Derives a fingerprint from an arbitrary key by hashing it with
    /// XXH3-128 (seed 0).
    pub fn from_key(key: &[u8]) -> Self {
        Fingerprint(*Digest::of(key).as_bytes())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        assert_eq!(Fingerprint::default(), Fingerprint::ZERO);
        assert_eq!(Fingerprint::ZERO.as_bytes(), &[0u8; 16]);
    }

    #[test]
    fn raw_bytes_verbatim() {
        let raw = [7u8; 16];
        assert_eq!(Fingerprint::from_raw(raw).as_bytes(), &raw);
    }

    #[test]
    fn key_is_hashed() {
        let fp = Fingerprint::from_key(b"my-tool-v2");
        assert_eq!(fp.as_bytes(), Digest::of(b"my-tool-v2").as_bytes());
        assert_ne!(fp, Fingerprint::ZERO);
    }

    #[test]
    fn key_derivation_deterministic() {
        assert_eq!(
            Fingerprint::from_key(b"same key"),
            Fingerprint::from_key(b"same key")
        );
        assert_ne!(
            Fingerprint::from_key(b"key a"),
            Fingerprint::from_key(b"key b")
        );
    }
}
