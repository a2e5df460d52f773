use super::*;
use crate::Result;

/// SlowRtBreaker trips on the ratio of requests slower than `max_allowed_rt_ms`.
#[derive(Debug)]
pub struct SlowRtBreaker {
    breaker: Arc<BreakerBase>,
    max_allowed_rt: u64,
    max_slow_request_ratio: f64,
    min_request_amount: u64,
    // stat needs to be shared, so we take Arc
    stat: Arc<CounterLeapArray>,
}

impl SlowRtBreaker {
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
            max_allowed_rt: rule.max_allowed_rt_ms,
            max_slow_request_ratio: rule.threshold,
            min_request_amount: rule.min_request_amount,
            breaker: Arc::new(BreakerBase::new(rule, listeners)),
            stat,
        }
    }
}

impl CircuitBreakerTrait for SlowRtBreaker {
    fn breaker(&self) -> &Arc<BreakerBase> {
        &self.breaker
    }

    fn stat(&self) -> &Arc<CounterLeapArray> {
        &self.stat
    }

    fn on_request_complete(&self, rt: u64, _err: &Option<Error>) {
        let slow = rt > self.max_allowed_rt;
        self.stat.current_bucket().value().record(slow);

        match self.current_state() {
            State::Open => {}
            // the probe alone decides
            State::HalfOpen => {
                if slow {
                    self.breaker.from_half_open_to_open(1.0);
                } else if self.breaker.from_half_open_to_closed() {
                    self.reset_metric();
                }
            }
            State::Closed => {
                let (slow_count, total_count) = self.stat.sum();
                if total_count < self.min_request_amount {
                    return;
                }
                let ratio = slow_count as f64 / total_count as f64;
                if ratio_exceeded(ratio, self.max_slow_request_ratio) {
                    self.breaker.from_closed_to_open(ratio);
                }
            }
        }
    }
}
