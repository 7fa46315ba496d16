//! Injectable logging for the I/O pool.
//!
//! The reference implementation prints through a process-wide `DISPLAYLEVEL`
//! global. Pools constructed by this crate instead take a `Logger`
//! implementation at construction time and never touch process globals,
//! so the same pool code runs identically embedded in a library, under
//! test, or behind a CLI with its own verbosity flag.

use std::fmt;
use std::sync::Arc;

/// Verbosity levels, in the same ordering as the reference CLI's
/// `DISPLAYLEVEL(level, ...)` macro: 1 = errors only, 4 = verbose.
pub const LEVEL_ERROR: u8 = 1;
pub const LEVEL_RESULT: u8 = 2;
pub const LEVEL_PROGRESS: u8 = 3;
pub const LEVEL_VERBOSE: u8 = 4;

/// A sink for pool diagnostics.
///
/// Implementations decide how to filter by `level` and where to send the
/// formatted message.
pub trait Logger: Send + Sync {
    fn log(&self, level: u8, args: fmt::Arguments<'_>);
}

/// Writes messages at or below `threshold` to stderr, mirroring the
/// reference CLI's default display behaviour.
pub struct StderrLogger {
    pub threshold: u8,
}

impl StderrLogger {
    pub fn new(threshold: u8) -> Self {
        StderrLogger { threshold }
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: u8, args: fmt::Arguments<'_>) {
        if level <= self.threshold {
            eprintln!("{args}");
        }
    }
}

/// Discards every message. Used by tests and library callers with no
/// interest in pool diagnostics.
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: u8, _args: fmt::Arguments<'_>) {}
}

/// Shared handle type pools are constructed with.
pub type SharedLogger = Arc<dyn Logger>;

/// Convenience constructor for a `NullLogger` behind the shared handle type.
pub fn null_logger() -> SharedLogger {
    Arc::new(NullLogger)
}
