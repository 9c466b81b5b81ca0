//! Reusable byte buffers for sidecar reads and writes.
//!
//! Buffers start at 4 KiB and are returned to a bounded crossbeam channel on
//! drop; oversized buffers are discarded instead of being pooled.

use std::ops::{Deref, DerefMut};

use crossbeam_channel::{Receiver, Sender, bounded};
use once_cell::sync::Lazy;

pub const INITIAL_CAPACITY: usize = 4096;
const MAX_POOLED_CAPACITY: usize = 1 << 20;
const POOL_SLOTS: usize = 64;

struct BufferPool {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

static POOL: Lazy<BufferPool> = Lazy::new(|| {
    let (tx, rx) = bounded(POOL_SLOTS);
    BufferPool { tx, rx }
});

/// A pooled `Vec<u8>`, cleared and handed back to the pool when dropped.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
}

impl PooledBuffer {
    pub fn take() -> Self {
        let buf = POOL
            .rx
            .try_recv()
            .unwrap_or_else(|_| Vec::with_capacity(INITIAL_CAPACITY));
        Self { buf }
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        if buf.capacity() <= MAX_POOLED_CAPACITY {
            buf.clear();
            let _ = POOL.tx.try_send(buf);
        }
    }
}

/// Frees every idle pooled buffer. Called once the workers have joined.
pub fn release_pooled_buffers() -> usize {
    POOL.rx.try_iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_come_back_empty() {
        {
            let mut buf = PooledBuffer::take();
            buf.extend_from_slice(b"hello");
        }
        let buf = PooledBuffer::take();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= INITIAL_CAPACITY);
    }
}
