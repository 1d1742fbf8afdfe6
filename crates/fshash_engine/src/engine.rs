//! Parallel file hashing over a work-stealing thread pool.
//!
//! Given a NUL-separated path buffer, the engine writes one 16-byte XXH3-128
//! digest (seed 0) per path, in input order. Scheduling is a single relaxed
//! atomic counter from which threads claim fixed-size index batches; every
//! slot belongs to exactly one claimed index, so workers write disjoint
//! 16-byte regions and no locks are needed on the hot path.
//!
//! A process-wide counter tracks threads spawned across overlapping engine
//! invocations so concurrent callers don't over-subscribe the CPU. The
//! budgeting is best-effort (relaxed ordering, momentary over-shoot is
//! harmless) and every invocation is guaranteed at least one thread.

use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use xxhash_rust::xxh3::{xxh3_128, Xxh3};

use fshash_common::pathlist;
use fshash_common::Digest;

use crate::error::EngineError;
use crate::file::{path_from_segment, FileHandle};

/// Per-thread read buffer size. Large enough to amortize syscalls and to
/// cover most source files in a single read.
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Upper bound on worker threads per invocation.
pub const MAX_THREADS: usize = 16;

/// Bounds for the dynamic work-stealing batch size.
const MIN_WORK_BATCH: usize = 1;
const MAX_WORK_BATCH: usize = 32;

/// Worker threads currently active across all engine invocations in this
/// process. Relaxed ordering throughout: the counter only shrinks spawn
/// counts, it is not a synchronization point.
static ACTIVE_HASH_THREADS: AtomicUsize = AtomicUsize::new(0);

/// Hashes every file in the encoded path list, returning `count × 16` bytes
/// of per-file digests in input order.
///
/// `concurrency` is a thread-count hint; 0 selects the hardware default.
/// Unreadable files and empty segments yield 16 zero bytes.
pub fn hash_files(encoded: &[u8], concurrency: usize) -> Result<Vec<u8>, EngineError> {
    let segments: Vec<&[u8]> = pathlist::iter(encoded).collect();
    let bytes = segments.len() * Digest::LEN;
    let mut out = Vec::new();
    out.try_reserve_exact(bytes)
        .map_err(|_| EngineError::OutOfMemory { bytes })?;
    out.resize(bytes, 0);
    run_parallel(&segments, concurrency, &mut out)?;
    Ok(out)
}

/// Like [`hash_files`], but writes the digests into `out` starting at
/// `offset`. Returns the number of bytes written.
pub fn hash_files_into(
    encoded: &[u8],
    concurrency: usize,
    out: &mut [u8],
    offset: usize,
) -> Result<usize, EngineError> {
    let segments: Vec<&[u8]> = pathlist::iter(encoded).collect();
    let needed = segments.len() * Digest::LEN;
    if offset.checked_add(needed).map_or(true, |end| end > out.len()) {
        return Err(EngineError::Range {
            what: "hash_files_into",
            needed,
            offset,
            available: out.len(),
        });
    }
    run_parallel(&segments, concurrency, &mut out[offset..offset + needed])?;
    Ok(needed)
}

/// Reads every file in the encoded path list in parallel, returning the raw
/// contents in input order. Unreadable files and empty segments are `None`.
pub fn read_files(
    encoded: &[u8],
    concurrency: usize,
) -> Result<Vec<Option<Vec<u8>>>, EngineError> {
    let segments: Vec<&[u8]> = pathlist::iter(encoded).collect();
    let mut results: Vec<Option<Vec<u8>>> = Vec::new();
    results
        .try_reserve_exact(segments.len())
        .map_err(|_| EngineError::OutOfMemory {
            bytes: segments.len() * std::mem::size_of::<Option<Vec<u8>>>(),
        })?;
    results.resize_with(segments.len(), || None);

    if segments.is_empty() {
        return Ok(results);
    }

    let plan = WorkPlan::compute(concurrency, segments.len());
    let mut slab = ReadSlab::allocate(plan.threads)?;
    let slots = SlotWriter::new(&mut results);
    let next = AtomicUsize::new(0);
    let _budget = ThreadBudget::acquire(plan.threads);

    thread::scope(|s| {
        let mut stripes = slab.stripes().into_iter();
        let own = stripes.next().expect("slab has one stripe per thread");
        for stripe in stripes {
            let slots = &slots;
            let next = &next;
            let segments = &segments;
            s.spawn(move || read_worker(segments, plan.batch, next, slots, stripe));
        }
        read_worker(&segments, plan.batch, &next, &slots, own);
    });

    Ok(results)
}

/// Runs the parallel hash over `segments`, filling `out` (already sized to
/// `segments.len() * 16` and zero-initialized by the callers above or owned
/// exclusively by them).
fn run_parallel(
    segments: &[&[u8]],
    concurrency: usize,
    out: &mut [u8],
) -> Result<(), EngineError> {
    debug_assert_eq!(out.len(), segments.len() * Digest::LEN);
    if segments.is_empty() {
        return Ok(());
    }

    let plan = WorkPlan::compute(concurrency, segments.len());
    let mut slab = ReadSlab::allocate(plan.threads)?;

    // SAFETY: `[u8; 16]` has alignment 1 and `out.len()` is an exact
    // multiple of 16, so reinterpreting the region as 16-byte slots is sound.
    let slots: &mut [[u8; Digest::LEN]] = unsafe {
        std::slice::from_raw_parts_mut(
            out.as_mut_ptr().cast::<[u8; Digest::LEN]>(),
            segments.len(),
        )
    };
    let slots = SlotWriter::new(slots);
    let next = AtomicUsize::new(0);
    let _budget = ThreadBudget::acquire(plan.threads);

    thread::scope(|s| {
        let mut stripes = slab.stripes().into_iter();
        let own = stripes.next().expect("slab has one stripe per thread");
        for stripe in stripes {
            let slots = &slots;
            let next = &next;
            s.spawn(move || hash_worker(segments, plan.batch, next, slots, stripe));
        }
        hash_worker(segments, plan.batch, &next, &slots, own);
    });

    Ok(())
}

/// Thread count and work-batch size for one invocation.
#[derive(Clone, Copy, Debug)]
struct WorkPlan {
    threads: usize,
    batch: usize,
}

impl WorkPlan {
    /// Resolves the caller's concurrency hint against the hardware, the
    /// process-wide thread budget, and the amount of work available.
    fn compute(concurrency: usize, file_count: usize) -> WorkPlan {
        let hw = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .max(2);

        let mut threads = if concurrency > 0 { concurrency } else { hw };
        threads = threads.clamp(1, MAX_THREADS);

        // Leave room for other invocations already hashing; never below one.
        let active = ACTIVE_HASH_THREADS.load(Ordering::Relaxed);
        threads = threads.min(hw.saturating_sub(active).max(1));

        // Target ~4 claiming rounds per thread: balances load without the
        // atomic counter dominating.
        let batch = (file_count / (threads * 4)).clamp(MIN_WORK_BATCH, MAX_WORK_BATCH);
        threads = threads.min(file_count.div_ceil(batch)).max(1);

        WorkPlan { threads, batch }
    }
}

/// RAII registration against the process-wide active-thread counter.
struct ThreadBudget(usize);

impl ThreadBudget {
    fn acquire(threads: usize) -> ThreadBudget {
        ACTIVE_HASH_THREADS.fetch_add(threads, Ordering::Relaxed);
        ThreadBudget(threads)
    }
}

impl Drop for ThreadBudget {
    fn drop(&mut self) {
        ACTIVE_HASH_THREADS.fetch_sub(self.0, Ordering::Relaxed);
    }
}

/// One contiguous allocation striped into per-thread read buffers.
///
/// A single slab instead of one allocation per thread, and the buffers never
/// touch the thread stacks (some targets default to 128 KiB stacks, half the
/// read buffer size). The 64-byte stripe alignment keeps threads off each
/// other's cache lines.
struct ReadSlab {
    lines: Vec<CacheLine>,
}

#[derive(Clone, Copy)]
#[repr(align(64))]
struct CacheLine([u8; 64]);

const LINES_PER_STRIPE: usize = READ_BUFFER_SIZE / 64;

impl ReadSlab {
    fn allocate(threads: usize) -> Result<ReadSlab, EngineError> {
        let lines = threads * LINES_PER_STRIPE;
        let mut slab = Vec::new();
        slab.try_reserve_exact(lines)
            .map_err(|_| EngineError::OutOfMemory {
                bytes: threads * READ_BUFFER_SIZE,
            })?;
        slab.resize(lines, CacheLine([0; 64]));
        Ok(ReadSlab { lines: slab })
    }

    /// Splits the slab into one `READ_BUFFER_SIZE` stripe per thread.
    fn stripes(&mut self) -> Vec<&mut [u8]> {
        self.lines
            .chunks_mut(LINES_PER_STRIPE)
            .map(|chunk| {
                // SAFETY: `CacheLine` is exactly 64 bytes with no padding, so
                // a chunk of them is a contiguous byte region.
                unsafe {
                    std::slice::from_raw_parts_mut(
                        chunk.as_mut_ptr().cast::<u8>(),
                        chunk.len() * 64,
                    )
                }
            })
            .collect()
    }
}

/// Shared writer over the per-index result slots.
///
/// Workers claim indices from the atomic counter; each index is claimed by
/// exactly one worker, which is what makes the unsynchronized writes sound.
struct SlotWriter<T> {
    base: *mut T,
    len: usize,
}

// SAFETY: every write targets the slot of an index claimed exactly once from
// the shared counter, so no two threads ever touch the same slot.
unsafe impl<T: Send> Send for SlotWriter<T> {}
unsafe impl<T: Send> Sync for SlotWriter<T> {}

impl<T> SlotWriter<T> {
    fn new(slots: &mut [T]) -> SlotWriter<T> {
        SlotWriter {
            base: slots.as_mut_ptr(),
            len: slots.len(),
        }
    }

    /// Writes `value` into slot `idx`. Callers must hold a unique claim on
    /// `idx`; the previous value is overwritten without being dropped (all
    /// slots start as zero bytes or `None`).
    fn write(&self, idx: usize, value: T) {
        assert!(idx < self.len);
        // SAFETY: in-bounds per the assert; exclusive per the claim contract.
        unsafe { ptr::write(self.base.add(idx), value) }
    }

    fn slot_ptr(&self, idx: usize) -> *const T {
        debug_assert!(idx < self.len);
        // SAFETY: in-bounds; the pointer is only used as a prefetch hint.
        unsafe { self.base.add(idx) }
    }
}

/// Per-thread hash loop: claim a batch of indices, hash each file into its
/// output slot, repeat until the counter runs past the end.
fn hash_worker(
    segments: &[&[u8]],
    batch: usize,
    next: &AtomicUsize,
    slots: &SlotWriter<[u8; Digest::LEN]>,
    rbuf: &mut [u8],
) {
    let count = segments.len();
    loop {
        let base = next.fetch_add(batch, Ordering::Relaxed);
        if base >= count {
            break;
        }
        let batch_end = (base + batch).min(count);

        for idx in base..batch_end {
            // Warm the next path's bytes and output slot while this file's
            // I/O is pending.
            if idx + 1 < batch_end {
                prefetch(segments[idx + 1].as_ptr());
                prefetch(slots.slot_ptr(idx + 1).cast::<u8>());
            }
            slots.write(idx, hash_one_file(segments[idx], rbuf));
        }
    }
}

/// Hashes a single file, returning 16 zero bytes for empty segments and on
/// any open or read failure.
fn hash_one_file(segment: &[u8], rbuf: &mut [u8]) -> [u8; Digest::LEN] {
    const ZERO: [u8; Digest::LEN] = [0; Digest::LEN];

    let Some(path) = path_from_segment(segment) else {
        return ZERO;
    };
    let Ok(mut file) = FileHandle::open(path) else {
        return ZERO;
    };
    let Ok(n) = file.read(rbuf) else {
        return ZERO;
    };
    if n < rbuf.len() {
        // Entire file arrived in one read: one-shot hash, the common case.
        return xxh3_128(&rbuf[..n]).to_be_bytes();
    }
    hash_streaming_tail(file, rbuf)
}

/// Streaming continuation for files larger than one read buffer. Kept
/// out-of-line so the 576-byte streaming state and its loop stay off the
/// hot path.
#[cold]
#[inline(never)]
fn hash_streaming_tail(mut file: FileHandle, rbuf: &mut [u8]) -> [u8; Digest::LEN] {
    let mut state = Xxh3::new();
    state.update(rbuf);
    loop {
        match file.read(rbuf) {
            Ok(0) => return state.digest128().to_be_bytes(),
            Ok(n) => state.update(&rbuf[..n]),
            Err(_) => return [0; Digest::LEN],
        }
    }
}

/// Per-thread read loop for [`read_files`]: same claiming scheme, collecting
/// file contents instead of digests. Slots keep their initial `None` on
/// empty segments and I/O errors.
fn read_worker(
    segments: &[&[u8]],
    batch: usize,
    next: &AtomicUsize,
    slots: &SlotWriter<Option<Vec<u8>>>,
    rbuf: &mut [u8],
) {
    let count = segments.len();
    loop {
        let base = next.fetch_add(batch, Ordering::Relaxed);
        if base >= count {
            break;
        }
        let batch_end = (base + batch).min(count);

        for idx in base..batch_end {
            if let Some(data) = read_one_file(segments[idx], rbuf) {
                slots.write(idx, Some(data));
            }
        }
    }
}

/// Reads a single file's raw contents, or `None` on any failure.
fn read_one_file(segment: &[u8], rbuf: &mut [u8]) -> Option<Vec<u8>> {
    let path = path_from_segment(segment)?;
    let mut file = FileHandle::open(path).ok()?;
    let mut data = Vec::new();
    loop {
        match file.read(rbuf) {
            Ok(0) => return Some(data),
            Ok(n) => data.extend_from_slice(&rbuf[..n]),
            Err(_) => return None,
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn prefetch(p: *const u8) {
    use core::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
    // SAFETY: prefetch is a hint; any address is acceptable.
    unsafe {
        _mm_prefetch::<{ _MM_HINT_T0 }>(p.cast::<i8>());
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn prefetch(_p: *const u8) {}
