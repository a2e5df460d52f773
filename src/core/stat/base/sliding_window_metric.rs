use super::{BucketLeapArray, BucketWrap, MetricBucket};
use crate::base::{
    check_validity_for_reuse_statistic, MetricEvent, ReadStat, DEFAULT_STATISTIC_MAX_RT,
};
use crate::utils::curr_time_millis;
use crate::Result;
use std::sync::Arc;

/// SlidingWindowMetric is a read-only view on a BucketLeapArray,
/// several of which might be associated with the same inner BucketLeapArray.
/// It does not store any data, it re-slices the buckets of the inner array
/// into a shorter interval, e.g. the per-second view on a resource's 10s statistic.
#[derive(Debug)]
pub struct SlidingWindowMetric {
    bucket_len_ms: u32,
    sample_count: u32,
    interval_ms: u32,
    inner: Arc<BucketLeapArray>,
}

impl SlidingWindowMetric {
    pub fn new(sample_count: u32, interval_ms: u32, inner: Arc<BucketLeapArray>) -> Result<Self> {
        check_validity_for_reuse_statistic(
            sample_count,
            interval_ms,
            inner.sample_count(),
            inner.interval_ms(),
        )?;
        Ok(SlidingWindowMetric {
            bucket_len_ms: interval_ms / sample_count,
            sample_count,
            interval_ms,
            inner,
        })
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn bucket_len_ms(&self) -> u32 {
        self.bucket_len_ms
    }

    /// Get the start time range of the bucket for the provided time.
    /// The actual time span is: [start, end + bucket_len_ms).
    pub(crate) fn bucket_start_range(&self, t_ms: u64) -> (u64, u64) {
        let end = self.inner.calculate_start_stamp(t_ms);
        let start = (end + self.inner.bucket_len_ms() as u64)
            .saturating_sub(self.interval_ms as u64);
        (start, end)
    }

    pub(crate) fn satisfied_buckets(&self, now: u64) -> Vec<Arc<BucketWrap<MetricBucket>>> {
        let (start, end) = self.bucket_start_range(now);
        self.inner
            .get_valid_values_conditional(now, &move |curr: u64| start <= curr && curr <= end)
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }

    pub fn sum_with_time(&self, now: u64, event: MetricEvent) -> u64 {
        self.satisfied_buckets(now)
            .iter()
            .map(|b| b.value().get(event))
            .sum()
    }

    pub fn qps_with_time(&self, now: u64, event: MetricEvent) -> f64 {
        self.sum_with_time(now, event) as f64 / self.interval_s()
    }

    pub fn max_of_single_bucket_with_time(&self, now: u64, event: MetricEvent) -> u64 {
        self.satisfied_buckets(now)
            .iter()
            .map(|b| b.value().get(event))
            .max()
            .unwrap_or(0)
    }

    pub fn max_of_single_bucket(&self, event: MetricEvent) -> u64 {
        self.max_of_single_bucket_with_time(curr_time_millis(), event)
    }

    pub fn max_concurrency(&self) -> u32 {
        self.satisfied_buckets(curr_time_millis())
            .iter()
            .map(|b| b.value().max_concurrency())
            .max()
            .unwrap_or(0)
    }

    pub fn avg_rt_with_time(&self, now: u64) -> f64 {
        let completed = self.sum_with_time(now, MetricEvent::Complete);
        if completed == 0 {
            0f64
        } else {
            self.sum_with_time(now, MetricEvent::Rt) as f64 / completed as f64
        }
    }

    pub fn min_rt_with_time(&self, now: u64) -> f64 {
        self.satisfied_buckets(now)
            .iter()
            .map(|b| b.value().min_rt())
            .fold(DEFAULT_STATISTIC_MAX_RT, u64::min) as f64
    }
}

impl ReadStat for SlidingWindowMetric {
    fn qps(&self, event: MetricEvent) -> f64 {
        self.qps_with_time(curr_time_millis(), event)
    }

    fn qps_previous(&self, event: MetricEvent) -> f64 {
        self.qps_with_time(
            curr_time_millis().saturating_sub(self.bucket_len_ms as u64),
            event,
        )
    }

    fn sum(&self, event: MetricEvent) -> u64 {
        self.sum_with_time(curr_time_millis(), event)
    }

    fn avg_rt(&self) -> f64 {
        self.avg_rt_with_time(curr_time_millis())
    }

    fn min_rt(&self) -> f64 {
        self.min_rt_with_time(curr_time_millis())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    const SAMPLE_COUNT: u32 = 20;
    const BUCKET_LEN_MS: u32 = 500; // 500 ms
    const INTERVAL_MS: u32 = BUCKET_LEN_MS * SAMPLE_COUNT; // 10 s

    fn inner() -> Arc<BucketLeapArray> {
        Arc::new(BucketLeapArray::new(SAMPLE_COUNT, INTERVAL_MS).unwrap())
    }

    #[test]
    fn new() {
        assert!(SlidingWindowMetric::new(4, 2000, inner()).is_ok());
        assert!(SlidingWindowMetric::new(0, 0, inner()).is_err());
        assert!(SlidingWindowMetric::new(4, 2001, inner()).is_err());
        assert!(SlidingWindowMetric::new(2, 2002, inner()).is_err());
        assert!(SlidingWindowMetric::new(4, 200000, inner()).is_err());
    }

    #[test]
    fn start_range() {
        // (sample_count, interval_ms, inner_sample_count, inner_interval_ms, now, start, end)
        let testcases = [
            (4, 2000, 20, 10000, 1578416556900u64, 1578416555000u64, 1578416556500u64),
            (2, 1000, 20, 10000, 1578416556900, 1578416556000, 1578416556500),
            (1, 2000, 10, 10000, 1578416556900, 1578416555000, 1578416556000),
            (1, 10000, 10, 20000, 1578416556900, 1578416548000, 1578416556000),
            (2, 1000, 20, 10000, 1578416556500, 1578416556000, 1578416556500),
        ];
        for (sample_count, interval_ms, inner_count, inner_interval, now, start, end) in testcases {
            let swm = SlidingWindowMetric::new(
                sample_count,
                interval_ms,
                Arc::new(BucketLeapArray::new(inner_count, inner_interval).unwrap()),
            )
            .unwrap();
            assert_eq!(swm.bucket_start_range(now), (start, end));
        }
    }

    #[test]
    fn per_second_view() {
        let arr = inner();
        let swm = SlidingWindowMetric::new(2, 1000, arr.clone()).unwrap();
        let now = 1578416556900u64;
        // outside the last second
        arr.add_count_with_time(now - 1500, MetricEvent::Pass, 7);
        // inside the last second
        arr.add_count_with_time(now - 600, MetricEvent::Pass, 2);
        arr.add_count_with_time(now, MetricEvent::Pass, 3);
        arr.add_count_with_time(now, MetricEvent::Complete, 2);
        arr.add_count_with_time(now, MetricEvent::Rt, 30);
        arr.add_count_with_time(now - 600, MetricEvent::Complete, 1);
        arr.add_count_with_time(now - 600, MetricEvent::Rt, 12);

        assert_eq!(swm.sum_with_time(now, MetricEvent::Pass), 5);
        assert_eq!(swm.qps_with_time(now, MetricEvent::Pass), 5.0);
        assert_eq!(swm.max_of_single_bucket_with_time(now, MetricEvent::Pass), 3);
        assert_eq!(swm.avg_rt_with_time(now), 42.0 / 3.0);
        assert_eq!(swm.min_rt_with_time(now), 12.0);
        assert_eq!(arr.count_with_time(now, MetricEvent::Pass), 12);
    }
}
