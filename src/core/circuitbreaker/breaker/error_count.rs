use super::*;
use crate::Result;

/// ErrorCountBreaker trips when the errors within the interval exceed the threshold.
#[derive(Debug)]
pub struct ErrorCountBreaker {
    breaker: Arc<BreakerBase>,
    min_request_amount: u64,
    error_count_threshold: f64,
    // stat needs to be shared, so we take Arc
    stat: Arc<CounterLeapArray>,
}

impl ErrorCountBreaker {
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
            error_count_threshold: rule.threshold,
            breaker: Arc::new(BreakerBase::new(rule, listeners)),
            stat,
        }
    }
}

impl CircuitBreakerTrait for ErrorCountBreaker {
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
                if total_count < self.min_request_amount {
                    return;
                }
                if error_count as f64 > self.error_count_threshold {
                    self.breaker.from_closed_to_open(error_count as f64);
                }
            }
        }
    }
}
