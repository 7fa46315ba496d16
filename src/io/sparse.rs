//! Sparse file write support for pool output.
//!
//! When written data contains long runs of zero bytes, writing every zero to
//! disk wastes I/O bandwidth and disk space. On Unix, filesystems that
//! support sparse files allow the kernel to represent such runs as holes: the
//! file's logical size reflects the full data length, but no physical blocks
//! are allocated for the zero regions.
//!
//! This module implements that optimisation via [`fwrite_sparse`] and
//! [`fwrite_sparse_end`], ported from `FIO_fwriteSparse` and
//! `FIO_fwriteSparseEnd` in the original C `fileio_utils.c`. On non-Unix
//! platforms the optimisation is skipped and a plain `write_all` is performed
//! instead.

use crate::error::{PoolError, PoolResult};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::mem;

/// One gigabyte — used as a safe upper bound for a single `seek` call.
///
/// Accumulated skips are capped at this value before issuing a `seek` to
/// prevent integer overflow in the stored-skips counter.
const ONE_GB: u64 = 1 << 30;

/// Size of a native word (usize) in bytes.
const WORD: usize = mem::size_of::<usize>();

/// Default sparse-write segment granularity in bytes (32 KiB).
///
/// Buffers are processed in chunks of this size. Each chunk is scanned for
/// leading zero words before deciding whether to seek or write.
pub const SPARSE_SEGMENT_SIZE: usize = 32 * 1024;

/// Writes `buf` to `file`, punching sparse holes for runs of zero bytes.
///
/// `test_mode` suppresses all I/O: no seek or write is issued and `Ok(0)` is
/// always returned, matching `FIO_fwriteSparse`'s `if (prefs->testMode)
/// return 0;` short-circuit.
///
/// When `sparse_mode` is `false` the buffer is written with a plain
/// `write_all` and `Ok(0)` is returned (`stored_skips` resets, since the
/// non-sparse path never accumulates skips).
///
/// When `sparse_mode` is `true` the buffer is examined in segments of
/// `sparse_threshold` bytes. Within each segment, leading zero *words*
/// (native `usize`-wide) are not written; instead their byte count is
/// accumulated in `stored_skips`. When a non-zero word is encountered the
/// accumulated skip is applied with `file.seek(SeekFrom::Current(…))`
/// (creating a hole on supporting filesystems), and the remainder of the
/// segment is written normally. Trailing bytes that are not a full `usize`
/// wide are handled byte-by-byte with the same logic.
///
/// Returns the updated `stored_skips` value. The caller must pass this back
/// on successive calls and ultimately supply it to [`fwrite_sparse_end`] to
/// materialise the final file size.
#[cfg(unix)]
pub fn fwrite_sparse(
    file: &File,
    buf: &[u8],
    sparse_threshold: usize,
    stored_skips: u64,
    sparse_mode: bool,
    test_mode: bool,
) -> PoolResult<u64> {
    if test_mode {
        return Ok(0);
    }

    if !sparse_mode {
        file.write_all(buf).map_err(PoolError::PlainWriteFailed)?;
        return Ok(0);
    }

    let mut stored_skips = stored_skips;

    // Guard against overflow in the seek offset: flush whole gigabytes first.
    if stored_skips > ONE_GB {
        file.seek(SeekFrom::Current(ONE_GB as i64))
            .map_err(PoolError::GigabyteSkipFailed)?;
        stored_skips -= ONE_GB;
    }

    let seg_size_words = (sparse_threshold / WORD).max(1);
    let aligned_len = buf.len() / WORD; // number of full usize words in buf
    let mut buf_remaining = aligned_len;
    let mut buf_pos = 0usize; // byte offset into buf

    // Process the word-aligned portion of the buffer in segments.
    while buf_pos < aligned_len * WORD {
        let seg_words = seg_size_words.min(buf_remaining);
        buf_remaining -= seg_words;

        // Count leading zero usize-words in this segment.
        let mut nb_zeros = 0usize;
        for i in 0..seg_words {
            let start = buf_pos + i * WORD;
            let word = usize::from_ne_bytes(buf[start..start + WORD].try_into().unwrap());
            if word != 0 {
                break;
            }
            nb_zeros += 1;
        }
        stored_skips += (nb_zeros * WORD) as u64;

        if nb_zeros != seg_words {
            // Segment contains non-zero data: apply accumulated seek, then
            // write from the first non-zero word to the end of the segment.
            file.seek(SeekFrom::Current(stored_skips as i64))
                .map_err(PoolError::SparseSkipFailed)?;
            stored_skips = 0;
            let write_start = buf_pos + nb_zeros * WORD;
            let write_len = (seg_words - nb_zeros) * WORD;
            file.write_all(&buf[write_start..write_start + write_len])
                .map_err(PoolError::SparseSegmentWriteFailed)?;
        }

        buf_pos += seg_words * WORD;
    }

    // Handle trailing bytes (buf.len() is not a multiple of WORD).
    let rest = &buf[aligned_len * WORD..];
    if !rest.is_empty() {
        let nb_zero_bytes = rest.iter().take_while(|&&b| b == 0).count();
        stored_skips += nb_zero_bytes as u64;
        if nb_zero_bytes < rest.len() {
            file.seek(SeekFrom::Current(stored_skips as i64))
                .map_err(PoolError::SparseSkipFailed)?;
            stored_skips = 0;
            file.write_all(&rest[nb_zero_bytes..])
                .map_err(PoolError::SparseTailWriteFailed)?;
        }
    }

    Ok(stored_skips)
}

/// Non-Unix fallback: writes the buffer as-is without sparse optimisation.
#[cfg(not(unix))]
pub fn fwrite_sparse(
    file: &File,
    buf: &[u8],
    _sparse_threshold: usize,
    _stored_skips: u64,
    _sparse_mode: bool,
    test_mode: bool,
) -> PoolResult<u64> {
    if test_mode {
        return Ok(0);
    }
    file.write_all(buf).map_err(PoolError::PlainWriteFailed)?;
    Ok(0)
}

/// Finalises a sparse write sequence.
///
/// If there are pending accumulated skips (trailing zeros that were seeked
/// over but never written), advances the file position by `stored_skips - 1`
/// bytes and writes a single zero byte. Writing the final byte forces the OS
/// to extend the file to the correct logical size; a bare `seek` would not
/// update the file's end-of-file marker on most systems.
///
/// Must be called exactly once after the last [`fwrite_sparse`] call, with
/// `test_mode` false (callers in test mode never accumulate skips, since
/// `fwrite_sparse` always returns 0 in that mode).
pub fn fwrite_sparse_end(file: &File, stored_skips: u64) -> PoolResult<()> {
    if stored_skips > 0 {
        file.seek(SeekFrom::Current((stored_skips - 1) as i64))
            .map_err(PoolError::SparseEndFailed)?;
        file.write_all(&[0u8]).map_err(PoolError::SparseEndFailed)?;
    }
    Ok(())
}
