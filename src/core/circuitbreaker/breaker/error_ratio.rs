use super::*;
use crate::Result;

/// ErrorRatioBreaker trips on the ratio of completed requests that ended with a business error.
#[derive(Debug)]
pub struct ErrorRatioBreaker {
    breaker: Arc<BreakerBase>,
    min_request_amount: u64,
    error_ratio_threshold: f64,
    stat: Arc<CounterLeapArray>,
}

impl ErrorRatioBreaker {
    pub fn new(rule: Arc<Rule>, listeners: StateChangeListeners) -> Result<Self> {
        let interval = rule.stat_interval_ms;
        let bucket_count = rule.get_rule_stat_sliding_window_bucket_count();
        let stat = CounterLeapArray::new(bucket_count, interval)?;
        Ok(Self::new_with_stat(rule, Arc::new(stat), listeners))
    }

    pub fn new_with_stat(
        rule: Arc<Rule>,
        stat: Arc<CounterLeapArray>,
        listeners: StateChangeListeners,
    ) -> Self {
        Self {
            min_request_amount: rule.min_request_amount,
            error_ratio_threshold: rule.threshold,
            breaker: Arc::new(BreakerBase::new(rule, listeners)),
            stat,
        }
    }
}

impl CircuitBreakerTrait for ErrorRatioBreaker {
    fn breaker(&self) -> &Arc<BreakerBase> {
        &self.breaker
    }

    fn stat(&self) -> &Arc<CounterLeapArray> {
        &self.stat
    }

    fn on_request_complete(&self, _rt: u64, err: &Option<Error>) {
        self.stat.current_bucket().value().record(err.is_some());

        match self.current_state() {
            State::Open => {}
            State::HalfOpen => {
                if err.is_some() {
                    self.breaker.from_half_open_to_open(1.0);
                } else if self.breaker.from_half_open_to_closed() {
                    self.reset_metric();
                }
            }
            State::Closed => {
                let (error_count, total_count) = self.stat.sum();
                if total_count < self.min_request_amount || total_count == 0 {
                    return;
                }
                let error_ratio = error_count as f64 / total_count as f64;
                if ratio_exceeded(error_ratio, self.error_ratio_threshold) {
                    self.breaker.from_closed_to_open(error_ratio);
                }
            }
        }
    }
}
