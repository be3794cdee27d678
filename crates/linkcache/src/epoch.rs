// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Write epochs that let a recompute notice writes which landed while it read the store.

use std::sync::atomic::{AtomicU64, Ordering};

use xxhash_rust::xxh3::xxh3_64;

const SLOTS: usize = 1024;

/// Per-key write counters, striped over a fixed number of slots.
///
/// Keys that share a slot see each other's writes. That only makes a recompute skip
/// caching its result more often than needed; it never lets a stale result through.
pub(crate) struct WriteEpochs {
    slots: Box<[AtomicU64]>,
}

impl WriteEpochs {
    pub(crate) fn new() -> Self {
        let slots: Vec<AtomicU64> = (0..SLOTS).map(|_| AtomicU64::new(0)).collect();
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    fn slot(&self, key: &str) -> &AtomicU64 {
        // SLOTS is a power of two.
        #[expect(clippy::cast_possible_truncation, reason = "only the low bits select a slot")]
        let index = (xxh3_64(key.as_bytes()) as usize) & (SLOTS - 1);
        &self.slots[index]
    }

    /// Returns the current epoch for `key`.
    pub(crate) fn current(&self, key: &str) -> u64 {
        self.slot(key).load(Ordering::SeqCst)
    }

    /// Records a write to `key` that the store has accepted.
    pub(crate) fn bump(&self, key: &str) {
        self.slot(key).fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_advances_only_the_written_slot() {
        let epochs = WriteEpochs::new();
        let before = epochs.current("abc123");

        epochs.bump("abc123");

        assert_eq!(epochs.current("abc123"), before + 1);
        let untouched = (0..64)
            .map(|i| format!("k{i:05}"))
            .filter(|key| epochs.current(key) == 0)
            .count();
        assert!(untouched >= 63);
    }
}
