//! Hash backend status reporting.
//!
//! All hashing goes through a single bit-exact XXH3 implementation; what
//! varies per machine is whether its SIMD-accelerated code paths are active.
//! [`init`] probes the CPU once, guarded by a [`OnceLock`] so concurrent
//! callers share one probe, and [`status`] reports the outcome without
//! forcing it.

use std::sync::OnceLock;

/// Which hashing code path is in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryStatus {
    /// The SIMD-accelerated code path is active.
    Native,
    /// The scalar fallback is active. Output is byte-identical to `Native`.
    Portable,
    /// [`init`] has not run yet.
    NotInitialized,
}

static STATUS: OnceLock<LibraryStatus> = OnceLock::new();

/// Probes the backend once and returns its status.
///
/// Idempotent: repeated calls return the first probe's result, and
/// concurrent callers block on the same initialization.
pub fn init() -> LibraryStatus {
    *STATUS.get_or_init(probe)
}

/// Returns the backend status without initializing.
pub fn status() -> LibraryStatus {
    STATUS
        .get()
        .copied()
        .unwrap_or(LibraryStatus::NotInitialized)
}

#[cfg(target_arch = "x86_64")]
fn probe() -> LibraryStatus {
    if std::arch::is_x86_feature_detected!("avx2")
        || std::arch::is_x86_feature_detected!("sse2")
    {
        LibraryStatus::Native
    } else {
        LibraryStatus::Portable
    }
}

#[cfg(target_arch = "aarch64")]
fn probe() -> LibraryStatus {
    // NEON is a baseline aarch64 feature.
    LibraryStatus::Native
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe() -> LibraryStatus {
    LibraryStatus::Portable
}
