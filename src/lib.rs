//! Asynchronous, ordered file I/O pool.
//!
//! Overlaps disk I/O with CPU-bound work on either side of a streaming
//! codec: a [`io::ReadPool`] pre-reads a source file into a ring of buffers
//! on a worker thread while delivering bytes to the consumer in strict
//! offset order despite unordered completion, and a [`io::WritePool`]
//! flushes output through a second worker, punching sparse holes for runs
//! of zero bytes along the way.
//!
//! The codec itself, CLI parsing, and configuration loading are out of
//! scope: this crate consumes already-open file handles and hands back
//! byte slices and job buffers.

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod threadpool;

pub use error::{PoolError, PoolResult};
pub use io::{Job, PoolPrefs, ReadPool, WritePool};
pub use logging::{Logger, NullLogger, StderrLogger};
pub use threadpool::TPool;
