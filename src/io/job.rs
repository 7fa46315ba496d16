//! Job / buffer record — the pool's unit of I/O.
//!
//! Mirrors `io_job_t` from `fileio_utils.h`, minus the back-pointer to the
//! owning pool (`ctx`) and the per-job `file` handle: both pools here keep
//! the file in their own shared state instead, since a job's lifetime is
//! already tied to the pool that issued it and Rust's ownership model makes
//! a weak back-reference unnecessary.
//!
//! A job's buffer must be `usize`-aligned to support the word-wise zero scan
//! in [`crate::io::sparse`]; `Vec<u8>`'s allocator already guarantees at
//! least pointer-width alignment, so no explicit alignment request is
//! needed here.

/// A reusable buffer cycled through a pool.
///
/// Ownership of a `Job` follows the state machine described in the pool
/// modules: available (held in the pool's free stack), in-flight (moved
/// into a worker closure), or completed (read pool only; held in the
/// completed list until the consumer claims it).
pub struct Job {
    pub buffer: Vec<u8>,
    pub used_buffer_size: usize,
    pub offset: u64,
}

impl Job {
    /// Allocates a job with a zeroed buffer of exactly `buffer_size` bytes.
    pub fn new(buffer_size: usize) -> Self {
        Job {
            buffer: vec![0u8; buffer_size],
            used_buffer_size: 0,
            offset: 0,
        }
    }

    /// Resets a job to its just-acquired state: no used bytes, offset 0.
    /// Does not touch buffer contents — callers overwrite what they use.
    pub fn reset(&mut self) {
        self.used_buffer_size = 0;
        self.offset = 0;
    }
}
