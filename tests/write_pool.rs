//! Integration tests for the write-side pool: round-trips, sparse holes, and
//! the synchronous/threaded API surface exercised the way a codec would use
//! it (acquire → fill job → enqueue_and_reacquire → close_file).

use iopool::io::prefs::PoolPrefs;
use iopool::io::write_pool::WritePool;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

fn prefs(buffer_size: usize, async_io: bool, sparse: bool) -> PoolPrefs {
    let mut p = PoolPrefs::default();
    p.buffer_size = buffer_size;
    p.async_io = async_io;
    p.sparse_file_support = if sparse { 1 } else { 0 };
    p
}

fn read_back(mut file: Arc<std::fs::File>) -> Vec<u8> {
    let file = Arc::get_mut(&mut file).expect("no outstanding clones");
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn round_trip_non_sparse_threaded() {
    let pool = WritePool::new_silent(prefs(16 * 1024, true, false)).unwrap();
    let f = tempfile::tempfile().unwrap();
    pool.set_file(Some(f));

    let data: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
    let mut job = pool.acquire();
    for chunk in data.chunks(16 * 1024) {
        job.buffer[..chunk.len()].copy_from_slice(chunk);
        job.used_buffer_size = chunk.len();
        pool.enqueue_and_reacquire(&mut job).unwrap();
    }
    pool.release(job);

    let file = pool.get_file().unwrap();
    pool.close_file().unwrap();
    assert_eq!(read_back(file), data);
    assert_eq!(pool.available_count(), pool.total_jobs());
}

#[test]
fn sparse_hole_round_trips_identically() {
    let mut data = vec![0x41u8; 4 * 1024];
    data.extend(vec![0u8; 128 * 1024]);
    data.extend(vec![0x42u8; 4 * 1024]);

    let pool = WritePool::new_silent(prefs(32 * 1024, false, true)).unwrap();
    let f = tempfile::tempfile().unwrap();
    pool.set_file(Some(f));

    let mut job = pool.acquire();
    for chunk in data.chunks(32 * 1024) {
        job.buffer[..chunk.len()].copy_from_slice(chunk);
        job.used_buffer_size = chunk.len();
        pool.enqueue_and_reacquire(&mut job).unwrap();
    }
    pool.release(job);

    let file = pool.get_file().unwrap();
    pool.close_file().unwrap();
    assert_eq!(read_back(file), data);
}

#[cfg(unix)]
#[test]
fn sparse_mode_uses_fewer_blocks_than_plain() {
    use std::os::unix::fs::MetadataExt;

    let mut data = vec![0xAAu8; 4 * 1024];
    data.extend(vec![0u8; 1024 * 1024]);
    data.extend(vec![0xBBu8; 4 * 1024]);

    let blocks_for = |sparse: bool| {
        let pool = WritePool::new_silent(prefs(32 * 1024, false, sparse)).unwrap();
        let f = tempfile::tempfile().unwrap();
        pool.set_file(Some(f));
        let mut job = pool.acquire();
        for chunk in data.chunks(32 * 1024) {
            job.buffer[..chunk.len()].copy_from_slice(chunk);
            job.used_buffer_size = chunk.len();
            pool.enqueue_and_reacquire(&mut job).unwrap();
        }
        pool.release(job);
        let file = pool.get_file().unwrap();
        pool.close_file().unwrap();
        file.metadata().unwrap().blocks()
    };

    let sparse_blocks = blocks_for(true);
    let plain_blocks = blocks_for(false);
    assert!(
        sparse_blocks < plain_blocks,
        "sparse={sparse_blocks} should be fewer blocks than plain={plain_blocks}"
    );
}

#[test]
fn tail_zeros_produce_exact_logical_size() {
    let mut data = vec![0x7Eu8; 768 * 1024];
    data.extend(vec![0u8; 256 * 1024]);

    let pool = WritePool::new_silent(prefs(64 * 1024, false, true)).unwrap();
    let f = tempfile::tempfile().unwrap();
    pool.set_file(Some(f));

    let mut job = pool.acquire();
    for chunk in data.chunks(64 * 1024) {
        job.buffer[..chunk.len()].copy_from_slice(chunk);
        job.used_buffer_size = chunk.len();
        pool.enqueue_and_reacquire(&mut job).unwrap();
    }
    pool.release(job);

    let file = pool.get_file().unwrap();
    pool.close_file().unwrap();
    let mut file_mut = file;
    let f = Arc::get_mut(&mut file_mut).unwrap();
    let len = f.seek(SeekFrom::End(0)).unwrap();
    assert_eq!(len, data.len() as u64);
}

#[test]
fn test_mode_writes_nothing_and_keeps_skips_zero() {
    // test_mode pools never bind a real file; acquire is legal because the
    // pool is in test mode.
    let mut pool_prefs = prefs(4 * 1024, true, false);
    pool_prefs.test_mode = true;
    let pool = WritePool::new_silent(pool_prefs).unwrap();

    for i in 0..100u8 {
        let mut job = pool.acquire();
        job.buffer.fill(i);
        job.used_buffer_size = job.buffer.len();
        pool.enqueue(job).unwrap();
    }
    pool.sparse_end().unwrap();
    assert_eq!(pool.available_count(), pool.total_jobs());
}

#[test]
fn synchronous_degradation_uses_single_job() {
    let pool = WritePool::new_silent(prefs(4096, false, false)).unwrap();
    assert_eq!(pool.total_jobs(), 1);
    let f = tempfile::tempfile().unwrap();
    pool.set_file(Some(f));
    let mut job = pool.acquire();
    job.buffer[..5].copy_from_slice(b"hello");
    job.used_buffer_size = 5;
    pool.enqueue(job).unwrap();

    let file = pool.get_file().unwrap();
    pool.close_file().unwrap();
    assert_eq!(&read_back(file)[..5], b"hello");
}
