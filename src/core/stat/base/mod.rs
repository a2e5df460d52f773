//! The sliding window engine: a generic ring of time buckets (`LeapArray`)
//! and its specializations for resource statistics.

mod bucket_leap_array;
mod leap_array;
mod metric_bucket;
mod sliding_window_metric;

pub use bucket_leap_array::*;
pub use leap_array::*;
pub use metric_bucket::*;
pub use sliding_window_metric::*;

use std::fmt;

/// Payload of a bucket.
/// Writes go through shared references, so implementations rely on atomics.
pub trait MetricTrait: fmt::Debug + Default + Send + Sync {
    /// zeroes the payload in place when its bucket is reused for a new time slice
    fn reset(&self);
}
