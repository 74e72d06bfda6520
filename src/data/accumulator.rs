use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::events::{Batch, ScoredTrade};

/// Shared buffer between the trade handler (appends) and the flush
/// scheduler (drains). The lock is held only for a push or a swap, never
/// across I/O.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    pending: Mutex<Vec<ScoredTrade>>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: ScoredTrade) {
        self.lock().push(record);
    }

    /// Takes everything buffered so far and leaves the buffer empty.
    /// Records appended after the swap land in the next drain.
    pub fn drain_all(&self) -> Batch {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic elsewhere while holding the lock cannot leave the Vec half
    // updated, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<ScoredTrade>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
