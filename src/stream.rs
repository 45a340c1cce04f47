//! Shared atomics for handing out nonce blocks and stopping workers early.
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Hands out consecutive, disjoint nonce blocks of a fixed size.
#[derive(Debug)]
pub struct BlockSource {
    next: AtomicU64,
    block_size: u64,
}

impl BlockSource {
    /// Create a source whose first block starts at `start`.
    pub const fn new(start: u64, block_size: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
            block_size,
        }
    }

    /// Reserve the next block, or `None` once the nonce space is exhausted.
    ///
    /// The last block is cut short at `u64::MAX`.
    pub fn fetch(&self) -> Option<Range<u64>> {
        let block_size = self.block_size;
        let start = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                (next != u64::MAX).then(|| next.saturating_add(block_size))
            })
            .ok()?;
        Some(start..start.saturating_add(block_size))
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }
}

#[derive(Debug)]
pub struct StopFlag {
    stop: AtomicBool,
}

impl StopFlag {
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn force_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}
