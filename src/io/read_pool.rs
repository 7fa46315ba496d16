//! Input-side I/O pool: read-ahead with strict offset-ordered delivery.
//!
//! Ported from `read_pool_ctx_t` / `ReadPool_*` in `fileio_utils.c`. Unlike
//! the write pool's single consumer-facing file handle, reads are issued as
//! positioned reads (`pread`, via [`std::os::unix::fs::FileExt::read_at`])
//! against a shared `Arc<File>` rather than one shared cursor — an
//! intentional departure from the reference's single `fread` cursor, made
//! possible because positioned reads don't need exclusive access to the
//! file to stay correct (see DESIGN.md).
//!
//! `next_read_offset`, `waiting_on_offset`, and the slider buffer
//! (`src_buffer_base`/`src_pos`/`src_buffer_loaded`) are touched only by the
//! consumer and therefore live as plain fields behind `&mut self`, never
//! behind the pool's mutex.

use crate::config::MAX_JOBS;
use crate::error::{PoolError, PoolResult};
use crate::io::job::Job;
use crate::io::prefs::PoolPrefs;
use crate::logging::{null_logger, SharedLogger};
use crate::threadpool::TPool;
use std::fs::File;
use std::io;
use std::sync::{Arc, Condvar, Mutex};

struct ReadShared {
    available: Vec<Job>,
    completed: Vec<Job>,
    reached_eof: bool,
    fatal: Option<PoolError>,
}

type ReadSync = (Mutex<ReadShared>, Condvar);

/// Input pool: the codec reads from [`ReadPool::src_buffer`] /
/// [`ReadPool::src_buffer_loaded`] and advances the window with
/// [`ReadPool::consume_bytes`] / [`ReadPool::fill_buffer`].
pub struct ReadPool {
    sync: Arc<ReadSync>,
    tpool: Option<TPool>,
    prefs: PoolPrefs,
    logger: SharedLogger,
    total_jobs: usize,

    file: Option<Arc<File>>,
    next_read_offset: u64,
    waiting_on_offset: u64,
    src_buffer_base: Vec<u8>,
    src_pos: usize,
    src_buffer_loaded: usize,
}

#[cfg(unix)]
fn positioned_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(not(unix))]
fn positioned_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Read, Seek, SeekFrom};
    let mut f = file;
    f.seek(SeekFrom::Start(offset))?;
    f.read(buf)
}

impl ReadPool {
    pub fn new(prefs: PoolPrefs, logger: SharedLogger) -> PoolResult<Self> {
        let total_jobs = if prefs.async_io { MAX_JOBS } else { 1 };
        let available: Vec<Job> = (0..total_jobs).map(|_| Job::new(prefs.buffer_size)).collect();

        let tpool = if prefs.async_io {
            Some(
                TPool::new(1, MAX_JOBS - 2)
                    .ok_or_else(|| PoolError::ThreadInit("read worker pool".to_string()))?,
            )
        } else {
            None
        };

        Ok(ReadPool {
            sync: Arc::new((
                Mutex::new(ReadShared {
                    available,
                    completed: Vec::new(),
                    reached_eof: false,
                    fatal: None,
                }),
                Condvar::new(),
            )),
            tpool,
            prefs,
            logger,
            total_jobs,
            file: None,
            next_read_offset: 0,
            waiting_on_offset: 0,
            src_buffer_base: vec![0u8; 2 * prefs.buffer_size],
            src_pos: 0,
            src_buffer_loaded: 0,
        })
    }

    pub fn new_silent(prefs: PoolPrefs) -> PoolResult<Self> {
        Self::new(prefs, null_logger())
    }

    pub fn total_jobs(&self) -> usize {
        self.total_jobs
    }

    pub fn available_count(&self) -> usize {
        self.sync.0.lock().unwrap().available.len()
    }

    /// The consumer's current sliding read window.
    pub fn src_buffer(&self) -> &[u8] {
        &self.src_buffer_base[self.src_pos..self.src_pos + self.src_buffer_loaded]
    }

    pub fn src_buffer_loaded(&self) -> usize {
        self.src_buffer_loaded
    }

    fn acquire(&self) -> Job {
        let mut s = self.sync.0.lock().unwrap();
        debug_assert!(!s.available.is_empty(), "ReadPool::acquire with no free job");
        let mut job = s.available.pop().expect("ReadPool::acquire with no free job");
        job.reset();
        job
    }

    fn release(&self, job: Job) {
        let mut s = self.sync.0.lock().unwrap();
        s.available.push(job);
    }

    fn enqueue(&self, job: Job) -> PoolResult<()> {
        if let Some(tpool) = &self.tpool {
            let sync = Arc::clone(&self.sync);
            let file = self.file.clone();
            let buffer_size = self.prefs.buffer_size;
            let logger = Arc::clone(&self.logger);
            tpool.submit_job(Box::new(move || {
                Self::run_read_task(&sync, file, buffer_size, &logger, job);
            }));
            Ok(())
        } else {
            Self::run_read_task(&self.sync, self.file.clone(), self.prefs.buffer_size, &self.logger, job);
            let mut s = self.sync.0.lock().unwrap();
            match s.fatal.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    /// Acquires a job, stamps it with the next contiguous offset, enqueues
    /// it. Keeps `next_read_offset` a monotonic tiling of the source file.
    fn enqueue_read(&mut self) -> PoolResult<()> {
        let mut job = self.acquire();
        job.offset = self.next_read_offset;
        self.next_read_offset += self.prefs.buffer_size as u64;
        self.enqueue(job)
    }

    /// Corresponds to `ReadPool_executeReadJob`.
    fn run_read_task(sync: &ReadSync, file: Option<Arc<File>>, buffer_size: usize, logger: &SharedLogger, mut job: Job) {
        let (lock, cond) = sync;

        {
            let s = lock.lock().unwrap();
            if s.reached_eof {
                drop(s);
                job.used_buffer_size = 0;
                let mut s = lock.lock().unwrap();
                s.completed.push(job);
                cond.notify_all();
                return;
            }
        }

        let result = match &file {
            Some(f) => positioned_read(f, &mut job.buffer[..buffer_size], job.offset),
            None => Ok(0),
        };

        // A short read only means EOF if it lands exactly on the file's
        // current length; otherwise it's a genuine short read (e.g. a
        // truncated/racing file) and must be reported as an error rather
        // than silently latched as end of stream.
        let short_read_is_eof = |n: usize| match &file {
            Some(f) => match f.metadata() {
                Ok(meta) => job.offset + n as u64 >= meta.len(),
                Err(_) => true,
            },
            None => true,
        };

        let mut s = lock.lock().unwrap();
        match result {
            Ok(n) if n == buffer_size => {
                job.used_buffer_size = n;
                s.completed.push(job);
            }
            Ok(n) if short_read_is_eof(n) => {
                job.used_buffer_size = n;
                s.reached_eof = true;
                s.completed.push(job);
            }
            Ok(_) => {
                logger.log(crate::logging::LEVEL_ERROR, format_args!("short read at offset {}", job.offset));
                if s.fatal.is_none() {
                    s.fatal = Some(PoolError::UnexpectedShortRead);
                }
            }
            Err(e) => {
                logger.log(crate::logging::LEVEL_ERROR, format_args!("read failed: {e}"));
                if s.fatal.is_none() {
                    s.fatal = Some(PoolError::ReadFailed(e));
                }
                // The job never reaches `completed`; it stays charged against
                // `total_jobs` as neither available nor completed until the
                // next `set_file`/`close_file` drain, which is fine since the
                // pool is torn down on any fatal error.
            }
        }
        cond.notify_all();
    }

    /// Scans `completed` for the job at `waiting_on_offset`; blocks on the
    /// pool's condvar while any task is still outstanding. Returns `Ok(None)`
    /// once every job is accounted for and none matched (pipeline drained).
    fn get_next_completed_job(&mut self) -> PoolResult<Option<Job>> {
        let (lock, cond) = &*self.sync;
        let mut s = lock.lock().unwrap();
        loop {
            if let Some(pos) = s.completed.iter().position(|j| j.offset == self.waiting_on_offset) {
                let job = s.completed.swap_remove(pos);
                self.waiting_on_offset += job.used_buffer_size as u64;
                return Ok(Some(job));
            }
            if let Some(e) = s.fatal.take() {
                return Err(e);
            }
            let outstanding = s.available.len() + s.completed.len() < self.total_jobs;
            if !outstanding {
                return Ok(None);
            }
            s = cond.wait(s).unwrap();
        }
    }

    /// Advances the window by `n` bytes. Precondition: `n <= src_buffer_loaded`.
    pub fn consume_bytes(&mut self, n: usize) {
        debug_assert!(n <= self.src_buffer_loaded, "consume_bytes(n) with n > loaded");
        self.src_pos += n;
        self.src_buffer_loaded -= n;
    }

    /// Pulls completed jobs in offset order until `src_buffer_loaded >= n`,
    /// EOF, or the pipeline drains. Returns the number of bytes newly added.
    ///
    /// Precondition: `n <= buffer_size` (the slider backing store is always
    /// large enough to satisfy this while data remains).
    pub fn fill_buffer(&mut self, n: usize) -> PoolResult<usize> {
        debug_assert!(n <= self.prefs.buffer_size, "fill_buffer(n) with n > buffer_size");
        let mut added = 0usize;
        while self.src_buffer_loaded < n {
            let job = match self.get_next_completed_job()? {
                Some(job) => job,
                None => break,
            };
            let used = job.used_buffer_size;
            let buffer_size = self.prefs.buffer_size;

            // Compact the window to the base of the slider if the incoming
            // payload would overflow the remaining tail space.
            let tail_space = self.src_buffer_base.len() - (self.src_pos + self.src_buffer_loaded);
            if used > tail_space {
                self.src_buffer_base
                    .copy_within(self.src_pos..self.src_pos + self.src_buffer_loaded, 0);
                self.src_pos = 0;
            }

            let dst_start = self.src_pos + self.src_buffer_loaded;
            self.src_buffer_base[dst_start..dst_start + used].copy_from_slice(&job.buffer[..used]);
            self.src_buffer_loaded += used;
            added += used;

            if used < buffer_size {
                // Short read: EOF. Stop without enqueuing a replacement.
                self.release(job);
                break;
            }
            self.release(job);
            self.enqueue_read()?;
        }
        Ok(added)
    }

    /// `consume_bytes(src_buffer_loaded)` followed by `fill_buffer(buffer_size)`.
    pub fn consume_and_refill(&mut self) -> PoolResult<usize> {
        self.consume_bytes(self.src_buffer_loaded);
        let buffer_size = self.prefs.buffer_size;
        self.fill_buffer(buffer_size)
    }

    fn drain(&mut self) -> PoolResult<()> {
        if let Some(tpool) = &self.tpool {
            tpool.jobs_completed();
        }
        let mut s = self.sync.0.lock().unwrap();
        // A fatal read error permanently loses the job that triggered it
        // (see `run_read_task`), so the usual job-conservation invariant no
        // longer holds; report the error instead of asserting on it.
        if let Some(e) = s.fatal.take() {
            return Err(e);
        }
        let completed: Vec<Job> = s.completed.drain(..).collect();
        s.available.extend(completed);
        debug_assert_eq!(s.available.len(), self.total_jobs, "ReadPool::set_file with jobs outstanding");
        s.reached_eof = false;
        Ok(())
    }

    /// Drains the pool, rebinds the file, resets offsets/EOF/slider, and (if
    /// a file was supplied) primes the pipeline with one read per buffer.
    pub fn set_file(&mut self, file: Option<File>) -> PoolResult<()> {
        self.drain()?;
        self.file = file.map(Arc::new);
        self.next_read_offset = 0;
        self.waiting_on_offset = 0;
        self.src_pos = 0;
        self.src_buffer_loaded = 0;

        if self.file.is_some() {
            let primed = self.available_count();
            for _ in 0..primed {
                self.enqueue_read()?;
            }
        }
        Ok(())
    }

    pub fn get_file(&self) -> Option<Arc<File>> {
        self.file.clone()
    }

    pub fn close_file(&mut self) -> PoolResult<()> {
        self.drain()?;
        self.file = None;
        Ok(())
    }
}
