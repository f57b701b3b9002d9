use super::EventCounter;
use super::striped::StripedCounter;
use crate::clock::Clock;
use crate::event_count::EventCount;
use arc_swap::ArcSwap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One sub-interval of the sliding window. Buckets are created only by
/// [`SlidingWindowCounter`] and, once created, never change their `timestamp` — only
/// their counters mutate, and only upward.
#[derive(Debug)]
struct Bucket {
    timestamp_millis: i64,
    success: StripedCounter,
    failure: StripedCounter,
}

impl Bucket {
    fn new(timestamp_millis: i64) -> Self {
        Self {
            timestamp_millis,
            success: StripedCounter::new(),
            failure: StripedCounter::new(),
        }
    }

    fn snapshot(&self) -> EventCount {
        EventCount::new(self.success.sum(), self.failure.sum())
    }
}

/// A concurrent, non-blocking, time-bucketed counter over a trailing window.
///
/// `on_success`/`on_failure` never block: in steady state (the common case) they land
/// on an atomic increment of the active bucket with no allocation and no lock. A bucket
/// rotation — which happens at most once per `update_interval` — briefly takes a mutex
/// to append the retired bucket to the reservoir and to recompute the cached snapshot;
/// that mutex is never touched on the hot per-event path.
///
/// See the module-level recording algorithm: events during an active bucket increment
/// it directly, events after it has expired rotate a fresh bucket in with a
/// compare-and-swap, and events that arrive with a clock that has stepped backward (or
/// that lost the rotation race) are recorded into a standalone "instant" bucket so they
/// are never dropped.
pub struct SlidingWindowCounter {
    clock: Arc<dyn Clock>,
    current: ArcSwap<Bucket>,
    reservoir: Mutex<VecDeque<Arc<Bucket>>>,
    snapshot: ArcSwap<EventCount>,
    window_millis: i64,
    update_interval_millis: i64,
}

impl std::fmt::Debug for SlidingWindowCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowCounter")
            .field("window_millis", &self.window_millis)
            .field("update_interval_millis", &self.update_interval_millis)
            .field("snapshot", &self.get_count())
            .finish()
    }
}

impl SlidingWindowCounter {
    pub fn new(clock: Arc<dyn Clock>, window: Duration, update_interval: Duration) -> Self {
        let now = clock.now_millis();
        Self {
            current: ArcSwap::from_pointee(Bucket::new(now)),
            reservoir: Mutex::new(VecDeque::new()),
            snapshot: ArcSwap::from_pointee(EventCount::ZERO),
            window_millis: window.as_millis() as i64,
            update_interval_millis: update_interval.as_millis() as i64,
            clock,
        }
    }

    fn record(&self, success: bool) {
        let now = self.clock.now_millis();
        let cur = self.current.load_full();

        if now < cur.timestamp_millis {
            // Case 1: backward clock. Preserve the event without touching `current`.
            self.append_instant_bucket(now, success);
            return;
        }

        if now < cur.timestamp_millis + self.update_interval_millis {
            // Case 2: within the active bucket's window. No allocation, no lock.
            bump(&cur, success);
            return;
        }

        // Case 3: the active bucket has expired. Roll a fresh one in.
        let next = Arc::new(Bucket::new(now));
        bump(&next, success);
        let prev = self.current.compare_and_swap(&cur, Arc::clone(&next));
        if Arc::ptr_eq(&prev, &cur) {
            // We won the rotation race.
            self.reservoir.lock().unwrap().push_back(cur);
            let sum = self.trim_and_sum(now);
            self.snapshot.store(Arc::new(sum));
        } else {
            // Someone else rotated first; `next`'s event is not lost, just shelved as
            // an instant bucket to be trimmed on the next rotation.
            self.reservoir.lock().unwrap().push_back(next);
        }
    }

    fn append_instant_bucket(&self, now: i64, success: bool) {
        let instant = Arc::new(Bucket::new(now));
        bump(&instant, success);
        self.reservoir.lock().unwrap().push_back(instant);
    }

    /// Remove buckets older than the window and return the sum of what remains.
    /// Buckets appended concurrently by another rotation mid-walk need not be summed
    /// this pass — they will be picked up on the next rotation.
    fn trim_and_sum(&self, now: i64) -> EventCount {
        let cutoff = now - self.window_millis;
        let mut reservoir = self.reservoir.lock().unwrap();
        let mut success = 0u64;
        let mut failure = 0u64;
        reservoir.retain(|bucket| {
            if bucket.timestamp_millis < cutoff {
                false
            } else {
                let snap = bucket.snapshot();
                success += snap.success();
                failure += snap.failure();
                true
            }
        });
        EventCount::new(success, failure)
    }
}

fn bump(bucket: &Bucket, success: bool) {
    if success {
        bucket.success.increment();
    } else {
        bucket.failure.increment();
    }
}

impl EventCounter for SlidingWindowCounter {
    fn on_success(&self) {
        self.record(true);
    }

    fn on_failure(&self) {
        self.record(false);
    }

    fn get_count(&self) -> EventCount {
        **self.snapshot.load()
    }
}
