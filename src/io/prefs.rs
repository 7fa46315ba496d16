//! Runtime-tunable preferences for the I/O pools.
//!
//! A trimmed-down sibling of the reference CLI's `Prefs` struct: only the
//! fields the pool itself consumes survive here (frame/block-format options
//! belong to the codec, out of scope for this crate).

/// Pool-wide runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct PoolPrefs {
    /// Enables the worker thread pool. When `false`, both pools degrade to
    /// inline synchronous execution with `total_jobs == 1`.
    pub async_io: bool,
    /// `0` = sparse writes off, `>0` = on. Write pool only.
    pub sparse_file_support: i32,
    /// Suppresses all writes; enqueues are accepted but no bytes reach disk
    /// and no sparse state accumulates.
    pub test_mode: bool,
    /// The unit of I/O; commonly the codec's preferred block size.
    pub buffer_size: usize,
}

impl PoolPrefs {
    /// `sparse_file_support > 0`, as a plain boolean for the sparse writer.
    pub fn sparse_mode(&self) -> bool {
        self.sparse_file_support > 0
    }

    pub fn set_async_io(&mut self, value: bool) -> &mut Self {
        self.async_io = value;
        self
    }

    pub fn set_sparse_file_support(&mut self, value: i32) -> &mut Self {
        self.sparse_file_support = value;
        self
    }

    pub fn set_test_mode(&mut self, value: bool) -> &mut Self {
        self.test_mode = value;
        self
    }

    /// Clamped to at least 1 byte — a zero-size buffer would make every
    /// pool operation a no-op.
    pub fn set_buffer_size(&mut self, value: usize) -> &mut Self {
        self.buffer_size = value.max(1);
        self
    }
}

impl Default for PoolPrefs {
    fn default() -> Self {
        PoolPrefs {
            async_io: true,
            sparse_file_support: 0,
            test_mode: false,
            buffer_size: 128 * 1024,
        }
    }
}
