//! Single-slot mailbox holding the latest published estimate.
//!
//! [`EstimateMailbox`] has one writer (the loop) and any number of
//! readers. The writer swaps a fresh `Arc<PublishedEstimate>` into the
//! slot; readers clone the `Arc`. A reader therefore always sees a
//! complete snapshot, never a pose from one tick paired with the quality
//! of another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fieldloc_core::PublishedEstimate;

/// Latest estimate plus a publication counter.
#[derive(Debug, Default)]
pub struct EstimateMailbox {
    slot: Mutex<Option<Arc<PublishedEstimate>>>,
    published: AtomicU64,
}

// Compile-time assertion: EstimateMailbox must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<EstimateMailbox>();
};

impl EstimateMailbox {
    /// An empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents. Single writer only.
    ///
    /// Returns the number of estimates published so far, this one
    /// included.
    pub fn publish(&self, estimate: PublishedEstimate) -> u64 {
        let arc = Arc::new(estimate);
        {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(arc);
        }
        // Release-store makes the new slot visible before the counter.
        self.published.fetch_add(1, Ordering::Release) + 1
    }

    /// The most recently published estimate, if any.
    pub fn latest(&self) -> Option<Arc<PublishedEstimate>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    /// Number of estimates published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}
