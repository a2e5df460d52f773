use time::{macros::format_description, OffsetDateTime};

const NANOS_PER_MILLI: i128 = 1_000_000;

#[inline]
pub fn sleep_for_ms(ms: u64) {
    std::thread::sleep(std::time::Duration::from_millis(ms));
}

#[inline]
fn cal_curr_time_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / NANOS_PER_MILLI) as u64
}

#[inline]
pub fn milli2nano<T: Into<i128>>(t: T) -> i128 {
    NANOS_PER_MILLI * t.into()
}

/// Formats a millisecond timestamp as `[hour]:[minute]:[second]` (UTC).
/// An out-of-range timestamp gives an empty string.
pub fn format_time_millis(ts_millis: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(milli2nano(ts_millis))
        .ok()
        .and_then(|t| {
            t.format(format_description!("[hour]:[minute]:[second]"))
                .ok()
        })
        .unwrap_or_default()
}

/// Current unix timestamp in milliseconds, served by the ticker when it is running.
pub fn curr_time_millis() -> u64 {
    let ticker_time = curr_time_millis_with_ticker();
    if ticker_time > 0 {
        ticker_time
    } else {
        cal_curr_time_millis()
    }
}

#[inline]
pub fn curr_time_nanos() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos()
}

pub use ticker::*;

// provide cached time by a ticker
pub mod ticker {
    use super::*;
    use crate::utils::PeriodicTask;
    use lazy_static::lazy_static;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    lazy_static! {
        static ref NOW_IN_MS: AtomicU64 = AtomicU64::new(0);
        static ref TICKER: Mutex<Option<PeriodicTask>> = Mutex::new(None);
    }

    /// `start_time_ticker()` starts a background task that caches current timestamp per millisecond,
    /// which may provide better performance in high-concurrency scenarios.
    /// Starting an already running ticker is a no-op.
    pub fn start_time_ticker() -> crate::Result<()> {
        let mut ticker = TICKER.lock().unwrap_or_else(|e| e.into_inner());
        if ticker.is_some() {
            return Ok(());
        }
        update_time();
        *ticker = Some(PeriodicTask::spawn(
            "sentinel-time-ticker",
            Duration::from_millis(1),
            update_time,
        )?);
        Ok(())
    }

    /// Stops the ticker, `curr_time_millis()` falls back to the system clock.
    pub fn stop_time_ticker() {
        let task = TICKER.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut task) = task {
            task.stop();
        }
        NOW_IN_MS.store(0, Ordering::SeqCst);
    }

    #[inline]
    fn update_time() {
        let curr = cal_curr_time_millis();
        NOW_IN_MS.store(curr, Ordering::SeqCst);
    }

    #[inline]
    pub(super) fn curr_time_millis_with_ticker() -> u64 {
        NOW_IN_MS.load(Ordering::SeqCst)
    }
}
