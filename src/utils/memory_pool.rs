//! Scratch buffer pool for the preprocessing pipeline
//!
//! Buffers are handed out as RAII guards and go back to the pool when the
//! guard is dropped, so every exit path of a caller (including early
//! returns) releases what it acquired. A pool has a size limit; requests
//! above it are refused instead of growing without bound.

use std::cell::{Cell, RefCell};
use std::ops::{Deref, DerefMut};

use crate::error::PreprocessError;

/// A pool of reusable `Vec<T>` scratch buffers
pub struct BufferPool<T> {
    free: RefCell<Vec<Vec<T>>>,
    outstanding: Cell<usize>,
    limit: usize,
    stats: Cell<AllocationStats>,
}

impl<T: Copy + Default> BufferPool<T> {
    /// Create a pool serving buffers of at most `limit` elements
    pub fn with_limit(limit: usize) -> Self {
        Self {
            free: RefCell::new(Vec::new()),
            outstanding: Cell::new(0),
            limit,
            stats: Cell::new(AllocationStats::default()),
        }
    }

    /// Take a zero-filled buffer of `len` elements
    pub fn acquire(&self, len: usize) -> Result<PooledBuffer<'_, T>, PreprocessError> {
        if len > self.limit {
            return Err(PreprocessError::ScratchExhausted {
                requested: len,
                limit: self.limit,
            });
        }

        let mut stats = self.stats.get();
        let reused = {
            let mut free = self.free.borrow_mut();
            match free.iter().position(|b| b.capacity() >= len) {
                Some(idx) => Some(free.swap_remove(idx)),
                None => free.pop(),
            }
        };
        let mut buf = match reused {
            Some(buf) if buf.capacity() >= len => {
                stats.reuses += 1;
                buf
            }
            Some(buf) => {
                stats.allocations += 1;
                buf
            }
            None => {
                stats.allocations += 1;
                Vec::with_capacity(len)
            }
        };
        self.stats.set(stats);

        buf.clear();
        buf.resize(len, T::default());
        self.outstanding.set(self.outstanding.get() + 1);
        Ok(PooledBuffer { pool: self, buf })
    }

    /// Buffers currently handed out
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// Allocation counters since creation
    pub fn stats(&self) -> AllocationStats {
        self.stats.get()
    }

    fn release(&self, buf: Vec<T>) {
        self.outstanding.set(self.outstanding.get().saturating_sub(1));
        self.free.borrow_mut().push(buf);
    }
}

/// A buffer on loan from a [`BufferPool`]
pub struct PooledBuffer<'a, T: Copy + Default> {
    pool: &'a BufferPool<T>,
    buf: Vec<T>,
}

impl<T: Copy + Default> Deref for PooledBuffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.buf
    }
}

impl<T: Copy + Default> DerefMut for PooledBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.buf
    }
}

impl<T: Copy + Default> Drop for PooledBuffer<'_, T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

/// Statistics for monitoring allocation patterns
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStats {
    pub reuses: usize,
    pub allocations: usize,
}

impl AllocationStats {
    /// Counters of two pools taken together
    pub fn combined(self, other: AllocationStats) -> AllocationStats {
        AllocationStats {
            reuses: self.reuses + other.reuses,
            allocations: self.allocations + other.allocations,
        }
    }
}
