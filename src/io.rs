//! Public API surface for the asynchronous, ordered file I/O pool.
//!
//! Assembles the pool's sub-modules and re-exports the symbols a codec
//! embeds this crate for. Organisation mirrors the split base+extension
//! layout of the original `fileio_utils.{c,h}`.

pub mod entropy;
pub mod job;
pub mod prefs;
pub mod read_pool;
pub mod sparse;
pub mod write_pool;

pub use job::Job;
pub use prefs::PoolPrefs;
pub use read_pool::ReadPool;
pub use write_pool::WritePool;
