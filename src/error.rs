//! Error type for the I/O pool.
//!
//! The reference implementation (`fileio_utils.c`) reports fatal I/O and
//! allocation failures with `EXM_THROW(code, …)`, a macro that prints a
//! numbered message and calls `exit(code)`. That pattern is replaced here
//! with a `Result`-returning API: every fatal path becomes a [`PoolError`]
//! variant, and [`PoolError::exit_code`] recovers the original numbered code
//! in case a caller (e.g. a CLI front-end) wants to preserve the original
//! process-exit behaviour.
//!
//! Assertion-class preconditions (acquiring from an empty free list, setting
//! a file while jobs are still outstanding, `consume_bytes(n)` with
//! `n > loaded`, …) are NOT represented here: they are programmer errors,
//! enforced with `debug_assert!` at the call site.

use std::io;

/// Fatal error surfaced at the pool boundary.
///
/// Each variant carries the numbered exit code from the reference CLI so a
/// caller can reproduce its process-exit behaviour.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Corresponds to exit code 37: read error or unexpected short read.
    #[error("Read error : {0}")]
    ReadFailed(#[source] io::Error),

    /// Corresponds to exit code 37: a read returned fewer bytes than
    /// requested without the file being at EOF.
    #[error("Unexpected short read")]
    UnexpectedShortRead,

    /// Corresponds to exit code 70: non-sparse write failed.
    #[error("Write error : cannot write decoded block : {0}")]
    PlainWriteFailed(#[source] io::Error),

    /// Corresponds to exit code 91: the intermediate 1 GiB sparse-skip seek
    /// (the overflow guard) failed.
    #[error("1 GB skip error (sparse file support) : {0}")]
    GigabyteSkipFailed(#[source] io::Error),

    /// Corresponds to exit code 92: an intermediate sparse-skip seek failed.
    #[error("Sparse skip error ; try disabling sparse mode : {0}")]
    SparseSkipFailed(#[source] io::Error),

    /// Corresponds to exit code 93: writing the non-zero remainder of a
    /// sparse segment failed.
    #[error("Write error : cannot write decoded block : {0}")]
    SparseSegmentWriteFailed(#[source] io::Error),

    /// Corresponds to exit code 95: writing the non-zero tail bytes of a
    /// sparse buffer failed.
    #[error("Write error : cannot write end of decoded block : {0}")]
    SparseTailWriteFailed(#[source] io::Error),

    /// Corresponds to exit code 69: the final sparse-skip seek, or the
    /// trailing zero byte write, failed in `sparse_end`.
    #[error("Final skip error (sparse file support) : {0}")]
    SparseEndFailed(#[source] io::Error),

    /// Corresponds to exit codes 100/101: buffer or job allocation failed.
    #[error("Allocation error : not enough memory")]
    Allocation,

    /// Corresponds to exit codes 102/103/104: mutex, condition variable, or
    /// worker-pool creation failed.
    #[error("Failed creating thread pool resources : {0}")]
    ThreadInit(String),
}

impl PoolError {
    /// Returns the numbered exit code matching the reference implementation's
    /// `exit(code)` behaviour, for callers that want to reproduce it.
    pub fn exit_code(&self) -> i32 {
        match self {
            PoolError::ReadFailed(_) | PoolError::UnexpectedShortRead => 37,
            PoolError::SparseEndFailed(_) => 69,
            PoolError::PlainWriteFailed(_) => 70,
            PoolError::GigabyteSkipFailed(_) => 91,
            PoolError::SparseSkipFailed(_) => 92,
            PoolError::SparseSegmentWriteFailed(_) => 93,
            PoolError::SparseTailWriteFailed(_) => 95,
            PoolError::Allocation => 100,
            PoolError::ThreadInit(_) => 104,
        }
    }
}

/// Convenience alias used throughout the pool modules.
pub type PoolResult<T> = Result<T, PoolError>;
