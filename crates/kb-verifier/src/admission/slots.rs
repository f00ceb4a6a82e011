//! Fixed-capacity slot pool with non-blocking acquisition.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded counting semaphore used only through `try_acquire`.
#[derive(Debug, Clone)]
pub struct SlotPool {
    sem: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Occupy a slot if one is free; never waits.
    pub fn try_acquire(&self) -> Option<Slot> {
        Arc::clone(&self.sem)
            .try_acquire_owned()
            .ok()
            .map(|permit| Slot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently occupied
    pub fn in_flight(&self) -> usize {
        self.capacity - self.sem.available_permits()
    }
}
