use super::MetricTrait;
use crate::utils::curr_time_millis;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

const DEFAULT_TIME: u64 = 0;

/// BucketWrap represent a slot to record metrics
/// The metric itself should be atomic
/// The length of BucketWrap could be seen in LeapArray.
/// The scope of time is [start_stamp, start_stamp+bucket_length)
#[derive(Debug, Default)]
pub struct BucketWrap<T: MetricTrait> {
    // The start timestamp of this statistic bucket wrapper.
    start_stamp: AtomicU64,
    // The actual data structure to record the metrics (e.g. MetricBucket).
    value: T,
}

impl<T: MetricTrait> BucketWrap<T> {
    pub fn new(start_stamp: u64) -> Self {
        BucketWrap {
            start_stamp: AtomicU64::new(start_stamp),
            value: T::default(),
        }
    }

    pub fn start_stamp(&self) -> u64 {
        self.start_stamp.load(Ordering::SeqCst)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn reset_start_stamp(&self, start_stamp: u64) {
        self.start_stamp.store(start_stamp, Ordering::SeqCst);
    }

    pub fn reset_value(&self) {
        self.value.reset();
    }

    pub fn is_time_in_bucket(&self, now: u64, bucket_len_ms: u32) -> bool {
        let start = self.start_stamp();
        start <= now && now < start + (bucket_len_ms as u64)
    }

    /// A bucket is deprecated once its slice starts more than `interval` before `now`.
    pub fn is_deprecated(&self, now: u64, interval: u64) -> bool {
        let start = self.start_stamp();
        now > start && now - start > interval
    }
}

/// The BucketWrap leap array,
/// it treats the inner array as a ring
/// sample_count represent the number of BucketWrap
/// interval_ms represent the interval of LeapArray.
/// For example, bucket_len_ms is 200ms, interval_ms is 1000ms, so sample_count is 5.
///
/// Writes go through the atomic metric `T`, only the reset of a deprecated bucket
/// is guarded by a per-slot lock.
#[derive(Debug)]
pub struct LeapArray<T: MetricTrait> {
    bucket_len_ms: u32,
    sample_count: u32,
    interval_ms: u32,
    pub(crate) array: Vec<Arc<BucketWrap<T>>>,
    locks: Vec<Mutex<()>>,
}

impl<T: MetricTrait> LeapArray<T> {
    pub fn new(sample_count: u32, interval_ms: u32) -> Result<Self> {
        if sample_count == 0 || interval_ms == 0 || interval_ms % sample_count != 0 {
            return Err(Error::msg(
                "Invalid sample count or interval_ms. Time span needs to be evenly divided",
            ));
        }
        let mut array = Vec::with_capacity(sample_count as usize);
        let mut locks = Vec::with_capacity(sample_count as usize);
        for _ in 0..sample_count {
            array.push(Arc::new(BucketWrap::default()));
            locks.push(Mutex::new(()));
        }
        Ok(LeapArray {
            bucket_len_ms: interval_ms / sample_count,
            sample_count,
            interval_ms,
            array,
            locks,
        })
    }

    pub fn bucket_len_ms(&self) -> u32 {
        self.bucket_len_ms
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn current_bucket(&self) -> Arc<BucketWrap<T>> {
        self.get_bucket_of_time(curr_time_millis())
    }

    /// Get bucket item at given time from the array.
    /// - (1) Bucket is absent, then claim it with a CAS on its start stamp.
    /// - (2) Bucket is up-to-date, then just return the bucket.
    /// - (3) Bucket is deprecated, then the thread holding the slot lock resets it,
    ///   others yield until the fresh bucket is published.
    /// - (4) Bucket already covers a newer slice, then a detached bucket is returned,
    ///   writes into it are not accounted.
    pub fn get_bucket_of_time(&self, now: u64) -> Arc<BucketWrap<T>> {
        let idx = self.time2idx(now) as usize;
        let target_start = self.calculate_start_stamp(now);
        let bucket = &self.array[idx];
        loop {
            let start = bucket.start_stamp();
            if start == DEFAULT_TIME {
                /*
                     B0       B1      B2    NULL      B4
                ||_______|_______|_______|_______|_______||___
                200     400     600     800     1000    1200  timestamp
                                            ^
                                         time=888
                           bucket is empty, so claim it
                */
                if bucket
                    .start_stamp
                    .compare_exchange(DEFAULT_TIME, target_start, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return Arc::clone(bucket);
                }
            } else if start == target_start {
                /*
                    B0       B1      B2     B3      B4
                ||_______|_______|_______|_______|_______||___
                200     400     600     800     1000    1200  timestamp
                                            ^
                                         time=888
                           start_stamp of Bucket 3: 800, so it's up-to-date
                */
                return Arc::clone(bucket);
            } else if target_start > start {
                /*
                  (old)
                            B0       B1      B2    NULL      B4
                |_______||_______|_______|_______|_______|_______||___
                ...    1200     1400    1600    1800    2000    2200  timestamp
                                             ^
                                          time=1676
                         start_stamp of Bucket 2: 400, deprecated, should be reset
                The value is zeroed before the new start stamp is published,
                so writers observing the new stamp never lose their counts.
                */
                let _guard = match self.locks[idx].try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => {
                        // the holder is resetting the bucket
                        std::thread::yield_now();
                        continue;
                    }
                };
                // another thread may have finished the reset before we got the lock
                if bucket.start_stamp() < target_start {
                    bucket.reset_value();
                    bucket.reset_start_stamp(target_start);
                }
            } else {
                return Arc::new(BucketWrap::new(target_start));
            }
        }
    }

    /// Get the bucket of the slice right before the one covering `now`.
    pub fn get_previous_bucket_of_time(&self, now: u64) -> Option<Arc<BucketWrap<T>>> {
        if now < self.bucket_len_ms as u64 {
            return None;
        }
        let previous = now - (self.bucket_len_ms as u64);
        let idx = self.time2idx(previous) as usize;
        let bucket = &self.array[idx];
        if bucket.is_deprecated(now, self.interval_ms as u64)
            || !bucket.is_time_in_bucket(previous, self.bucket_len_ms)
        {
            return None;
        }
        Some(Arc::clone(bucket))
    }

    /// compute the start timestamp of current bucket
    pub(crate) fn calculate_start_stamp(&self, now: u64) -> u64 {
        now - now % (self.bucket_len_ms as u64)
    }

    pub(crate) fn time2idx(&self, now: u64) -> u64 {
        let idx = now / (self.bucket_len_ms as u64);
        idx % (self.sample_count as u64)
    }

    pub fn get_current_values(&self) -> Vec<Arc<BucketWrap<T>>> {
        self.get_valid_values(curr_time_millis())
    }

    ///  Get all BucketWrap between [now - leap array interval, now]
    pub fn get_valid_values(&self, now: u64) -> Vec<Arc<BucketWrap<T>>> {
        self.get_valid_values_conditional(now, &|_| true)
    }

    pub fn get_valid_values_conditional(
        &self,
        now: u64,
        condition: &dyn Fn(u64) -> bool,
    ) -> Vec<Arc<BucketWrap<T>>> {
        self.array
            .iter()
            .filter(|bucket| {
                bucket.start_stamp() != DEFAULT_TIME
                    && !bucket.is_deprecated(now, self.interval_ms as u64)
                    && condition(bucket.start_stamp())
            })
            .cloned()
            .collect()
    }
}
