use super::{LeapArray, MetricBucket};
use crate::base::{MetricEvent, WriteStat, DEFAULT_STATISTIC_MAX_RT};
use crate::utils::curr_time_millis;

/// a specialization of `LeapArray<T>` with `MetricBucket`
pub type BucketLeapArray = LeapArray<MetricBucket>;

impl WriteStat for BucketLeapArray {
    fn add_count(&self, event: MetricEvent, count: u64) {
        self.add_count_with_time(curr_time_millis(), event, count);
    }
}

impl BucketLeapArray {
    pub fn add_count_with_time(&self, now: u64, event: MetricEvent, count: u64) {
        self.get_bucket_of_time(now).value().add(event, count);
    }

    pub fn update_concurrency(&self, concurrency: u32) {
        self.update_concurrency_with_time(curr_time_millis(), concurrency);
    }

    pub fn update_concurrency_with_time(&self, now: u64, concurrency: u32) {
        self.get_bucket_of_time(now)
            .value()
            .update_concurrency(concurrency);
    }

    pub fn count(&self, event: MetricEvent) -> u64 {
        self.count_with_time(curr_time_millis(), event)
    }

    pub fn count_with_time(&self, now: u64, event: MetricEvent) -> u64 {
        self.get_valid_values(now)
            .iter()
            .map(|b| b.value().get(event))
            .sum()
    }

    pub fn min_rt(&self) -> u64 {
        self.get_current_values()
            .iter()
            .map(|b| b.value().min_rt())
            .fold(DEFAULT_STATISTIC_MAX_RT, u64::min)
    }

    pub fn max_concurrency(&self) -> u32 {
        self.get_current_values()
            .iter()
            .map(|b| b.value().max_concurrency())
            .fold(0, u32::max)
    }
}
