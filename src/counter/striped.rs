//! A contention-resilient add-only counter: several independently-updatable cells,
//! summed on read. Preferred over a single `AtomicU64` with a CAS retry loop because
//! writers never spin against each other — each thread's increments land on whichever
//! cell its thread id hashes to, and reads pay the summation cost only once per
//! bucket rotation rather than once per event.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

const STRIPES: usize = 8;

// Padded to a cache line so adjacent stripes never false-share.
#[repr(align(64))]
#[derive(Debug, Default)]
struct Stripe(AtomicU64);

#[derive(Debug)]
pub(crate) struct StripedCounter {
    cells: [Stripe; STRIPES],
}

impl StripedCounter {
    pub(crate) fn new() -> Self {
        Self {
            cells: Default::default(),
        }
    }

    pub(crate) fn increment(&self) {
        self.cells[stripe_index()].0.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sum(&self) -> u64 {
        self.cells.iter().map(|c| c.0.load(Ordering::Relaxed)).sum()
    }
}

fn stripe_index() -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    (hasher.finish() as usize) % STRIPES
}
