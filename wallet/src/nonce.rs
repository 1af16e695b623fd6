//! Per-sender nonce allocation.
//!
//! Each sender gets its own fair (FIFO) async mutex guarding a single
//! `next_nonce` slot. `allocate` holds the lock across at most one RPC
//! round-trip, and only on first use when the floor is unknown; every
//! later allocation is pure bookkeeping. Losing a cross-process race is
//! expected to surface as a broadcast rejection, after which the floor is
//! re-read and bumped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use catalyst_core::Address;

#[derive(Default)]
struct Slot {
    next: Option<u64>,
}

/// Hands out strictly increasing, contiguous nonces per sender.
#[derive(Default)]
pub struct NonceAllocator {
    slots: StdMutex<HashMap<Address, Arc<Mutex<Slot>>>>,
}

impl NonceAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, sender: &Address) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().expect("nonce map poisoned");
        slots.entry(*sender).or_default().clone()
    }

    /// Allocate the next nonce for `sender`.
    ///
    /// `fetch_committed` is awaited exactly once per sender lifetime, when
    /// the floor is unknown; it must return the sender's committed nonce.
    /// Calls for the same sender are served FIFO and return strictly
    /// increasing values; the critical section is released on every path.
    pub async fn allocate<F, Fut, E>(&self, sender: &Address, fetch_committed: F) -> Result<u64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64, E>>,
    {
        let slot = self.slot(sender);
        let mut guard = slot.lock().await;
        let next = match guard.next {
            Some(next) => next,
            None => fetch_committed().await?.saturating_add(1),
        };
        guard.next = Some(next.saturating_add(1));
        Ok(next)
    }

    /// Raise the floor after observing `committed` on-chain.
    ///
    /// Called after every balance/nonce refresh and on broadcast failure;
    /// the floor only ever rises.
    pub async fn bump_floor(&self, sender: &Address, committed: u64) {
        let slot = self.slot(sender);
        let mut guard = slot.lock().await;
        let floor = committed.saturating_add(1);
        guard.next = Some(guard.next.map_or(floor, |next| next.max(floor)));
    }

    /// The value the next `allocate` would return, if the floor is known.
    pub async fn peek(&self, sender: &Address) -> Option<u64> {
        let slot = self.slot(sender);
        let guard = slot.lock().await;
        guard.next
    }
}
