use crate::stat::{LeapArray, MetricTrait};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter holds the per-bucket statistic of a circuit breaker:
/// `target` counts the slow or erroneous requests, `total` all completed ones.
#[derive(Debug, Default)]
pub struct Counter {
    pub(crate) target: AtomicU64,
    pub(crate) total: AtomicU64,
}

impl MetricTrait for Counter {
    fn reset(&self) {
        self.target.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
    }
}

impl Counter {
    pub fn record(&self, is_target: bool) {
        if is_target {
            self.target.fetch_add(1, Ordering::SeqCst);
        }
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn target(&self) -> u64 {
        self.target.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

pub type CounterLeapArray = LeapArray<Counter>;

impl CounterLeapArray {
    /// `(target, total)` summed over the buckets within the interval
    pub fn sum(&self) -> (u64, u64) {
        self.get_current_values()
            .iter()
            .fold((0, 0), |(target, total), c| {
                (target + c.value().target(), total + c.value().total())
            })
    }
}
