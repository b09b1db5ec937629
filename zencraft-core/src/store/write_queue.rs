//! Dirty-field write queue
//!
//! Field edits made through synced handlers land here before they reach the
//! store cache. Writes to the same item and field coalesce, keeping the
//! position of the first write and the value of the last. `drain` hands the
//! pending writes over in order.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub item_id: Uuid,
    pub item_type: String,
    pub field: String,
    pub value: Value,
}

#[derive(Debug)]
pub struct DirtyFieldQueue {
    pending: Mutex<Vec<PendingWrite>>,
    generation: AtomicU64,
    debounce: Duration,
}

impl DirtyFieldQueue {
    pub fn new(debounce: Duration) -> Self {
        Self { pending: Mutex::new(Vec::new()), generation: AtomicU64::new(0), debounce }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue a write and return its generation
    ///
    /// A scheduled flush should only run if its generation is still the
    /// latest once the debounce delay has passed.
    pub fn push(&self, write: PendingWrite) -> u64 {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending
            .iter_mut()
            .find(|p| p.item_id == write.item_id && p.field == write.field)
        {
            Some(existing) => existing.value = write.value,
            None => pending.push(write),
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Take every pending write, oldest first
    pub fn drain(&self) -> Vec<PendingWrite> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Drop pending writes for one item
    pub fn discard(&self, item_id: Uuid) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p.item_id != item_id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
