//! Output-side I/O pool: sparse-aware, ordered writes on a single worker.
//!
//! Ported from the `write_pool_ctx_t` / `WritePool_*` functions in
//! `fileio_utils.c`. The base pool's free-list/file-binding machinery is
//! folded directly into [`WriteShared`] rather than composed from a
//! separate `IoPool` value — Rust's ownership model makes the C version's
//! `ctx` back-pointer from job to pool unnecessary, so there is nothing left
//! for a shared base type to coordinate beyond what's here.
//!
//! Only one worker is ever running at a time (`TPool::new(1, ...)`), so
//! `stored_skips` needs no per-task locking.

use crate::config::MAX_JOBS;
use crate::error::{PoolError, PoolResult};
use crate::io::job::Job;
use crate::io::prefs::PoolPrefs;
use crate::io::sparse::{fwrite_sparse, fwrite_sparse_end};
use crate::logging::{null_logger, SharedLogger};
use crate::threadpool::TPool;
use std::fs::File;
use std::sync::{Arc, Mutex};

struct WriteShared {
    available: Vec<Job>,
    file: Option<Arc<File>>,
    stored_skips: u64,
    fatal: Option<PoolError>,
}

/// Output pool: the codec acquires a job, fills `job.buffer`, sets
/// `job.used_buffer_size`, and hands it back via [`WritePool::enqueue`] or
/// [`WritePool::enqueue_and_reacquire`].
pub struct WritePool {
    shared: Arc<Mutex<WriteShared>>,
    tpool: Option<TPool>,
    prefs: PoolPrefs,
    logger: SharedLogger,
    total_jobs: usize,
}

impl WritePool {
    /// Builds a pool with `MAX_JOBS` buffers (threaded) or a single buffer
    /// (synchronous), per `prefs.async_io`. No file is bound yet; call
    /// [`WritePool::set_file`] before the first `acquire`.
    pub fn new(prefs: PoolPrefs, logger: SharedLogger) -> PoolResult<Self> {
        let total_jobs = if prefs.async_io { MAX_JOBS } else { 1 };
        let available = (0..total_jobs).map(|_| Job::new(prefs.buffer_size)).collect();

        let tpool = if prefs.async_io {
            Some(
                TPool::new(1, MAX_JOBS - 2)
                    .ok_or_else(|| PoolError::ThreadInit("write worker pool".to_string()))?,
            )
        } else {
            None
        };

        Ok(WritePool {
            shared: Arc::new(Mutex::new(WriteShared {
                available,
                file: None,
                stored_skips: 0,
                fatal: None,
            })),
            tpool,
            prefs,
            logger,
            total_jobs,
        })
    }

    /// Convenience constructor using a [`crate::logging::NullLogger`].
    pub fn new_silent(prefs: PoolPrefs) -> PoolResult<Self> {
        Self::new(prefs, null_logger())
    }

    pub fn total_jobs(&self) -> usize {
        self.total_jobs
    }

    /// Number of jobs currently on the free stack. Exposed for tests that
    /// check job-conservation at quiescent points.
    pub fn available_count(&self) -> usize {
        self.shared.lock().unwrap().available.len()
    }

    /// Pops a free job off the stack, resets its metadata.
    ///
    /// Precondition: a file must be bound, or the pool is in test mode.
    /// Fails by assertion if no free job exists — the caller is expected to
    /// respect `total_jobs`.
    pub fn acquire(&self) -> Job {
        let mut s = self.shared.lock().unwrap();
        debug_assert!(
            s.file.is_some() || self.prefs.test_mode,
            "WritePool::acquire with no bound file"
        );
        debug_assert!(!s.available.is_empty(), "WritePool::acquire with no free job");
        let mut job = s.available.pop().expect("WritePool::acquire with no free job");
        job.reset();
        job
    }

    /// Returns a job to the free stack without running its task.
    pub fn release(&self, job: Job) {
        let mut s = self.shared.lock().unwrap();
        s.available.push(job);
    }

    /// Submits `job`'s contents for writing. Threaded: dispatched to the
    /// worker. Synchronous: executed inline before returning.
    ///
    /// A threaded enqueue cannot surface a write failure synchronously; it
    /// is stashed in the shared state and returned by the next call to
    /// [`WritePool::join`], [`WritePool::sparse_end`], or
    /// [`WritePool::close_file`].
    pub fn enqueue(&self, job: Job) -> PoolResult<()> {
        if let Some(tpool) = &self.tpool {
            let shared = Arc::clone(&self.shared);
            let prefs = self.prefs;
            let logger = Arc::clone(&self.logger);
            tpool.submit_job(Box::new(move || {
                Self::run_write_task(&shared, prefs, &logger, job);
            }));
            Ok(())
        } else {
            Self::run_write_task(&self.shared, self.prefs, &self.logger, job);
            self.take_fatal()
        }
    }

    /// Enqueues `*job_slot` and replaces it with a freshly acquired job, so
    /// the codec never has to interleave a separate release/acquire pair.
    pub fn enqueue_and_reacquire(&self, job_slot: &mut Job) -> PoolResult<()> {
        let fresh = self.acquire();
        let old = std::mem::replace(job_slot, fresh);
        self.enqueue(old)
    }

    /// Worker task body: sparse-write the job's payload, fold the returned
    /// skip count back into shared state, release the job.
    ///
    /// Corresponds to `WritePool_executeWriteJob` in the reference.
    fn run_write_task(shared: &Mutex<WriteShared>, prefs: PoolPrefs, logger: &SharedLogger, job: Job) {
        let (file, stored_skips) = {
            let s = shared.lock().unwrap();
            (s.file.clone(), s.stored_skips)
        };

        let result = match &file {
            Some(file) => fwrite_sparse(
                file,
                &job.buffer[..job.used_buffer_size],
                crate::io::sparse::SPARSE_SEGMENT_SIZE,
                stored_skips,
                prefs.sparse_mode(),
                prefs.test_mode,
            ),
            None => {
                debug_assert!(prefs.test_mode, "write task with no file outside test mode");
                Ok(0)
            }
        };

        let mut s = shared.lock().unwrap();
        match result {
            Ok(new_skips) => s.stored_skips = new_skips,
            Err(e) => {
                logger.log(crate::logging::LEVEL_ERROR, format_args!("write failed: {e}"));
                if s.fatal.is_none() {
                    s.fatal = Some(e);
                }
            }
        }
        s.available.push(job);
    }

    /// Blocks until all in-flight write tasks finish. No-op in synchronous
    /// mode. Returns the first fatal error observed since the last check,
    /// if any.
    pub fn join(&self) -> PoolResult<()> {
        if let Some(tpool) = &self.tpool {
            tpool.jobs_completed();
        }
        self.take_fatal()
    }

    /// Joins, then finalises the sparse-write sequence and resets
    /// `stored_skips` to 0.
    pub fn sparse_end(&self) -> PoolResult<()> {
        self.join()?;
        let mut s = self.shared.lock().unwrap();
        let skips = s.stored_skips;
        s.stored_skips = 0;
        if let Some(file) = s.file.clone() {
            fwrite_sparse_end(&file, skips)?;
        }
        Ok(())
    }

    /// Rebinds the pool's file. Precondition: every job is free (no writes
    /// outstanding) and `stored_skips == 0` (the caller must have already
    /// called [`WritePool::sparse_end`]).
    pub fn set_file(&self, file: Option<File>) {
        let mut s = self.shared.lock().unwrap();
        debug_assert_eq!(
            s.available.len(),
            self.total_jobs,
            "WritePool::set_file with jobs still outstanding"
        );
        debug_assert_eq!(s.stored_skips, 0, "WritePool::set_file with undrained sparse state");
        s.file = file.map(Arc::new);
    }

    pub fn get_file(&self) -> Option<Arc<File>> {
        self.shared.lock().unwrap().file.clone()
    }

    /// `sparse_end` followed by unbinding the file. The underlying `File` is
    /// dropped (and thus closed) once every clone held by in-flight tasks
    /// has also been dropped.
    pub fn close_file(&self) -> PoolResult<()> {
        self.sparse_end()?;
        self.set_file(None);
        Ok(())
    }

    fn take_fatal(&self) -> PoolResult<()> {
        let mut s = self.shared.lock().unwrap();
        match s.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    fn prefs(buffer_size: usize, async_io: bool, sparse: bool) -> PoolPrefs {
        let mut p = PoolPrefs::default();
        p.buffer_size = buffer_size;
        p.async_io = async_io;
        p.sparse_file_support = if sparse { 1 } else { 0 };
        p
    }

    #[test]
    fn acquire_release_conserves_jobs() {
        let pool = WritePool::new_silent(prefs(1024, false, false)).unwrap();
        let f = tempfile::tempfile().unwrap();
        pool.set_file(Some(f));
        let job = pool.acquire();
        assert_eq!(pool.available_count(), 0);
        pool.release(job);
        assert_eq!(pool.available_count(), pool.total_jobs());
    }

    #[test]
    fn synchronous_round_trip_writes_bytes() {
        let pool = WritePool::new_silent(prefs(16, false, false)).unwrap();
        let f = tempfile::tempfile().unwrap();
        pool.set_file(Some(f));

        let mut job = pool.acquire();
        let payload = b"hello world12345";
        job.buffer[..payload.len()].copy_from_slice(payload);
        job.used_buffer_size = payload.len();
        pool.enqueue(job).unwrap();
        pool.join().unwrap();

        let mut file = pool.get_file().unwrap();
        pool.close_file().unwrap();
        let file = Arc::get_mut(&mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        assert_eq!(&out, payload);
    }

    #[test]
    fn threaded_round_trip_matches_synchronous() {
        let pool = WritePool::new_silent(prefs(16, true, false)).unwrap();
        let f = tempfile::tempfile().unwrap();
        pool.set_file(Some(f));

        let mut job = pool.acquire();
        let payload = b"threaded write!!";
        job.buffer[..payload.len()].copy_from_slice(payload);
        job.used_buffer_size = payload.len();
        pool.enqueue(job).unwrap();
        pool.close_file().unwrap();
        assert_eq!(pool.available_count(), pool.total_jobs());
    }

    #[test]
    fn test_mode_suppresses_all_writes() {
        let pool = WritePool::new_silent(prefs(16, false, true)).unwrap();
        for _ in 0..100 {
            let mut job = pool.acquire();
            job.buffer.fill(0xAB);
            job.used_buffer_size = job.buffer.len();
            pool.enqueue(job).unwrap();
        }
        pool.sparse_end().unwrap();
        assert_eq!(pool.shared.lock().unwrap().stored_skips, 0);
    }

    #[test]
    fn sparse_write_then_end_extends_file_to_logical_size() {
        let pool = WritePool::new_silent(prefs(32, false, true)).unwrap();
        let f = tempfile::tempfile().unwrap();
        pool.set_file(Some(f));

        let mut job = pool.acquire();
        job.buffer.fill(0);
        job.used_buffer_size = job.buffer.len();
        pool.enqueue(job).unwrap();

        let mut file = pool.get_file().unwrap();
        pool.close_file().unwrap();
        let file = Arc::get_mut(&mut file).unwrap();
        let len = file.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(len, 32);
    }
}
