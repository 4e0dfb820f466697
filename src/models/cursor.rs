use serde::{Deserialize, Serialize};

/// Next block height that has not been scanned yet.
///
/// Only moves forward. Lives in memory for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    next_block: u64,
}

impl Cursor {
    pub const fn new(next_block: u64) -> Self {
        Self { next_block }
    }

    pub const fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Move the cursor to `next_block`. Returns false and leaves the cursor
    /// untouched when that would move it backwards.
    pub fn advance_to(&mut self, next_block: u64) -> bool {
        if next_block < self.next_block {
            return false;
        }
        self.next_block = next_block;
        true
    }
}

/// Inclusive block range `[from, to]` requested in a single log fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    pub from: u64,
    pub to: u64,
}

impl ScanRange {
    /// Next range to scan starting at `from`, capped at `window` blocks and at
    /// the chain tip. `None` when `from` is past the tip.
    pub fn next(from: u64, latest: u64, window: u64) -> Option<Self> {
        if from > latest {
            return None;
        }
        let span = window.max(1) - 1;
        let to = from.saturating_add(span).min(latest);
        Some(Self { from, to })
    }

    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Cursor value after this range has been scanned
    pub fn next_cursor(&self) -> u64 {
        self.to + 1
    }
}
