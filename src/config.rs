//! Compile-time configuration constants for the I/O pool.
//!
//! Migrated from `fileio_utils.h` (`examples/original_source/programs/`),
//! the header that defines `MAX_IO_JOBS` for the split base+extension
//! AsyncIO layer this crate implements.

/// Maximum number of jobs (buffers) held by a single pool instance.
///
/// Corresponds to `MAX_IO_JOBS` in `fileio_utils.h`. When a pool runs with
/// `async_io` disabled, only one of these slots is ever used
/// (`total_jobs == 1`); the remaining capacity exists purely for the
/// threaded case.
pub const MAX_JOBS: usize = 10;
