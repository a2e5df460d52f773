//!  Circuit Breaker State Machine:
//!
//!                                switch to open based on rule
//!
//!             +-----------------------------------------------------------------------+
//!             |                                                                       |
//!             |                                                                       v
//!     +----------------+                   +----------------+      Probe      +----------------+
//!     |                |                   |                |<----------------|                |
//!     |                |   Probe succeed   |                |                 |                |
//!     |     Closed     |<------------------|    HalfOpen    |                 |      Open      |
//!     |                |                   |                |   Probe failed  |                |
//!     |                |                   |                +---------------->|                |
//!     +----------------+                   +----------------+                 +----------------+
//!

#![allow(clippy::wrong_self_convention)]

/// Error count
pub mod error_count;
/// Error ratio
pub mod error_ratio;
/// Slow round trip time
pub mod slow_request;
pub mod stat;

pub use error_count::*;
pub use error_ratio::*;
pub use slow_request::*;
pub use stat::*;

use super::*;
use crate::{
    base::{EntryContext, Snapshot},
    logging,
    stat::MetricTrait,
    utils, Error,
};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};

/// `BreakerStrategy` represents the strategy of circuit breaker.
/// Each strategy is associated with one rule type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum BreakerStrategy {
    /// `SlowRequestRatio` strategy changes the circuit breaker state based on slow request ratio
    SlowRequestRatio,
    /// `ErrorRatio` strategy changes the circuit breaker state based on error request ratio
    ErrorRatio,
    /// `ErrorCount` strategy changes the circuit breaker state based on error amount
    ErrorCount,
    #[serde(skip)]
    Custom(u8),
}

impl Default for BreakerStrategy {
    fn default() -> BreakerStrategy {
        BreakerStrategy::SlowRequestRatio
    }
}

/// States of Circuit Breaker State Machine
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl Default for State {
    fn default() -> State {
        State::Closed
    }
}

impl From<u8> for State {
    fn from(v: u8) -> State {
        match v {
            1 => State::HalfOpen,
            2 => State::Open,
            _ => State::Closed,
        }
    }
}

/// `StateChangeListener` listens on the circuit breaker state change event
pub trait StateChangeListener: Sync + Send {
    /// on_transform_to_closed is triggered when circuit breaker state transformed to Closed.
    fn on_transform_to_closed(&self, prev: State, rule: Arc<Rule>);

    /// `on_transform_to_open` is triggered when circuit breaker state transformed to Open.
    /// The "snapshot" indicates the triggered value when the transformation occurs.
    fn on_transform_to_open(&self, prev: State, rule: Arc<Rule>, snapshot: Option<Arc<Snapshot>>);

    /// `on_transform_to_half_open` is triggered when circuit breaker state transformed to HalfOpen.
    fn on_transform_to_half_open(&self, prev: State, rule: Arc<Rule>);
}

impl std::fmt::Debug for dyn StateChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateChangeListener")
    }
}

/// The listeners shared by all breakers of one manager.
/// Breakers read the current list on every transition, so registering takes effect immediately.
pub type StateChangeListeners = Arc<ArcSwap<Vec<Arc<dyn StateChangeListener>>>>;

pub fn new_state_change_listeners() -> StateChangeListeners {
    Arc::new(ArcSwap::from_pointee(Vec::new()))
}

/// `CircuitBreakerTrait` is the basic trait of circuit breaker
pub trait CircuitBreakerTrait: Send + Sync {
    /// `breaker` returns the associated inner breaker.
    fn breaker(&self) -> &Arc<BreakerBase>;

    /// `stat` returns the associated statistic data structure.
    fn stat(&self) -> &Arc<CounterLeapArray>;

    /// `try_pass` acquires permission of an invocation only if it is available at the time of invocation.
    /// In Open state, the first call after the retry timeout becomes the probe and moves the breaker to HalfOpen,
    /// every other call is refused until the probe completes.
    fn try_pass(&self, ctx: &mut EntryContext) -> bool {
        match self.current_state() {
            State::Closed => true,
            State::Open => {
                self.breaker().retry_timeout_arrived() && self.breaker().from_open_to_half_open(ctx)
            }
            State::HalfOpen => false,
        }
    }

    #[inline]
    fn next_retry_timestamp_ms(&self) -> u64 {
        self.breaker().next_retry_timestamp_ms()
    }

    /// `bound_rule` returns the associated circuit breaking rule.
    #[inline]
    fn bound_rule(&self) -> &Arc<Rule> {
        self.breaker().bound_rule()
    }

    /// `current_state` returns current state of the circuit breaker.
    #[inline]
    fn current_state(&self) -> State {
        self.breaker().current_state()
    }

    /// the value which made the breaker open last time
    #[inline]
    fn trip_snapshot(&self) -> f64 {
        self.breaker().trip_snapshot()
    }

    /// `on_request_complete` record a completed request with the given response time as well as error (if present),
    /// and handle state transformation of the circuit breaker.
    /// `on_request_complete` is called only when a passed invocation finished.
    fn on_request_complete(&self, rt: u64, error: &Option<Error>);

    /// zeroes the bucket of the current time slice
    fn reset_metric(&self) {
        self.stat().current_bucket().value().reset()
    }
}

/// BreakerBase encompasses the common fields of circuit breaker.
#[derive(Debug)]
pub struct BreakerBase {
    rule: Arc<Rule>,
    /// retry_timeout_ms represents recovery timeout (in milliseconds) before the circuit breaker opens.
    retry_timeout_ms: u32,
    /// next_retry_timestamp_ms is the time circuit breaker could probe
    next_retry_timestamp_ms: AtomicU64,
    /// `State` as u8, transitions are compare-and-set
    state: AtomicU8,
    /// f64 bits of the value that tripped the breaker
    snapshot: AtomicU64,
    listeners: StateChangeListeners,
}

impl BreakerBase {
    pub fn new(rule: Arc<Rule>, listeners: StateChangeListeners) -> Self {
        BreakerBase {
            retry_timeout_ms: rule.retry_timeout_ms,
            rule,
            next_retry_timestamp_ms: AtomicU64::new(0),
            state: AtomicU8::new(State::Closed as u8),
            snapshot: AtomicU64::new(0f64.to_bits()),
            listeners,
        }
    }

    pub fn bound_rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    pub fn current_state(&self) -> State {
        State::from(self.state.load(Ordering::SeqCst))
    }

    /// Forces the state, no listener is notified.
    pub fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn next_retry_timestamp_ms(&self) -> u64 {
        self.next_retry_timestamp_ms.load(Ordering::SeqCst)
    }

    pub fn trip_snapshot(&self) -> f64 {
        f64::from_bits(self.snapshot.load(Ordering::SeqCst))
    }

    pub fn retry_timeout_arrived(&self) -> bool {
        utils::curr_time_millis() >= self.next_retry_timestamp_ms.load(Ordering::SeqCst)
    }

    pub fn update_next_retry_timestamp(&self) {
        self.next_retry_timestamp_ms.store(
            utils::curr_time_millis() + self.retry_timeout_ms as u64,
            Ordering::SeqCst,
        );
    }

    fn transform(&self, from: State, to: State) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn notify_open(&self, prev: State, snapshot: f64) {
        for listener in self.listeners.load().iter() {
            listener.on_transform_to_open(prev, Arc::clone(&self.rule), Some(Arc::new(snapshot)));
        }
    }

    /// from_closed_to_open updates circuit breaker state machine from closed to open.
    /// Return true only if the current thread successfully accomplished the transformation.
    pub fn from_closed_to_open(&self, snapshot: f64) -> bool {
        if !self.transform(State::Closed, State::Open) {
            return false;
        }
        self.snapshot.store(snapshot.to_bits(), Ordering::SeqCst);
        self.update_next_retry_timestamp();
        self.notify_open(State::Closed, snapshot);
        true
    }

    /// from_open_to_half_open updates circuit breaker state machine from open to half-open.
    /// Return true only if the current thread successfully accomplished the transformation,
    /// that thread's call is the probe.
    pub fn from_open_to_half_open(self: &Arc<Self>, ctx: &mut EntryContext) -> bool {
        if !self.transform(State::Open, State::HalfOpen) {
            return false;
        }
        for listener in self.listeners.load().iter() {
            listener.on_transform_to_half_open(State::Open, Arc::clone(&self.rule));
        }
        // a probe blocked by a later rule never reports back, return to Open so another call can probe
        let breaker = Arc::clone(self);
        ctx.when_exit(Box::new(move |ctx: &EntryContext| {
            if ctx.is_blocked() && breaker.transform(State::HalfOpen, State::Open) {
                logging::debug!(
                    "[CircuitBreaker] Probe of {} was blocked, back to Open",
                    breaker.rule.resource
                );
                breaker.notify_open(State::HalfOpen, 1.0);
            }
        }));
        true
    }

    /// from_half_open_to_open updates circuit breaker state machine from half-open to open.
    /// Return true only if the current thread successfully accomplished the transformation.
    pub fn from_half_open_to_open(&self, snapshot: f64) -> bool {
        if !self.transform(State::HalfOpen, State::Open) {
            return false;
        }
        self.snapshot.store(snapshot.to_bits(), Ordering::SeqCst);
        self.update_next_retry_timestamp();
        self.notify_open(State::HalfOpen, snapshot);
        true
    }

    /// from_half_open_to_closed updates circuit breaker state machine from half-open to closed
    /// Return true only if the current thread successfully accomplished the transformation.
    pub fn from_half_open_to_closed(&self) -> bool {
        if !self.transform(State::HalfOpen, State::Closed) {
            return false;
        }
        for listener in self.listeners.load().iter() {
            listener.on_transform_to_closed(State::HalfOpen, Arc::clone(&self.rule));
        }
        true
    }
}

/// `current > threshold`, or both equal to 1.0 so that a threshold of 100% can still trip.
pub(crate) fn ratio_exceeded(current: f64, threshold: f64) -> bool {
    current > threshold || (current == threshold && threshold == 1.0)
}

#[cfg(test)]
pub(crate) use test::{MockCircuitBreaker, MockStateListener};

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::base::{BlockType, TokenResult};
    use mockall::predicate::*;
    use mockall::*;
    use std::thread;

    mock! {
        pub(crate) CircuitBreaker {}
        impl CircuitBreakerTrait for CircuitBreaker {
            fn breaker(&self) -> &Arc<BreakerBase>;
            fn stat(&self) -> &Arc<CounterLeapArray>;
            fn bound_rule(&self) -> &Arc<Rule>;
            fn next_retry_timestamp_ms(&self) -> u64;
            fn try_pass(&self, ctx: &mut EntryContext) -> bool;
            fn current_state(&self) -> State;
            fn trip_snapshot(&self) -> f64;
            fn on_request_complete(&self, rt: u64, error: &Option<Error>);
            fn reset_metric(&self);
        }
    }

    mock! {
        pub(crate) StateListener {}
        impl StateChangeListener for StateListener {
            fn on_transform_to_closed(&self, prev: State, rule: Arc<Rule>);
            fn on_transform_to_open(&self, prev: State, rule: Arc<Rule>, snapshot: Option<Arc<Snapshot>>);
            fn on_transform_to_half_open(&self, prev: State, rule: Arc<Rule>);
        }
    }

    pub(crate) fn rule(strategy: BreakerStrategy, threshold: f64) -> Arc<Rule> {
        Arc::new(Rule {
            resource: "abc".into(),
            strategy,
            retry_timeout_ms: 3000,
            min_request_amount: 5,
            stat_interval_ms: 10000,
            max_allowed_rt_ms: 100,
            threshold,
            ..Default::default()
        })
    }

    fn base_with(listener: MockStateListener) -> Arc<BreakerBase> {
        let listeners = new_state_change_listeners();
        listeners.store(Arc::new(vec![Arc::new(listener) as Arc<dyn StateChangeListener>]));
        Arc::new(BreakerBase::new(
            rule(BreakerStrategy::SlowRequestRatio, 0.5),
            listeners,
        ))
    }

    #[test]
    fn state_from_u8() {
        for s in [State::Closed, State::HalfOpen, State::Open] {
            assert_eq!(State::from(s as u8), s);
        }
    }

    #[test]
    fn ratio_boundary() {
        assert!(ratio_exceeded(0.6, 0.5));
        assert!(!ratio_exceeded(0.5, 0.5));
        assert!(ratio_exceeded(1.0, 1.0));
        assert!(!ratio_exceeded(0.9, 1.0));
    }

    #[test]
    fn closed_to_open() {
        let mut listener = MockStateListener::new();
        listener
            .expect_on_transform_to_open()
            .withf(|prev, _, snapshot| {
                *prev == State::Closed
                    && snapshot
                        .as_deref()
                        .and_then(|s| s.as_any().downcast_ref::<f64>())
                        == Some(&0.6)
            })
            .once()
            .return_const(());
        let base = base_with(listener);
        assert!(base.from_closed_to_open(0.6));
        assert!(!base.from_closed_to_open(0.7));
        assert_eq!(base.current_state(), State::Open);
        assert_eq!(base.trip_snapshot(), 0.6);
        assert!(base.next_retry_timestamp_ms() >= utils::curr_time_millis());
        assert!(!base.retry_timeout_arrived());
    }

    #[test]
    fn half_open_transitions() {
        let mut listener = MockStateListener::new();
        listener
            .expect_on_transform_to_closed()
            .with(eq(State::HalfOpen), always())
            .once()
            .return_const(());
        listener
            .expect_on_transform_to_open()
            .withf(|prev, _, _| *prev == State::HalfOpen)
            .once()
            .return_const(());
        let base = base_with(listener);
        assert!(!base.from_half_open_to_closed());
        base.set_state(State::HalfOpen);
        assert!(base.from_half_open_to_closed());
        assert_eq!(base.current_state(), State::Closed);
        base.set_state(State::HalfOpen);
        assert!(base.from_half_open_to_open(1.0));
        assert_eq!(base.current_state(), State::Open);
    }

    #[test]
    fn blocked_probe_rolls_back() {
        let mut listener = MockStateListener::new();
        listener
            .expect_on_transform_to_half_open()
            .once()
            .return_const(());
        listener
            .expect_on_transform_to_open()
            .withf(|prev, _, _| *prev == State::HalfOpen)
            .once()
            .return_const(());
        let base = base_with(listener);
        base.set_state(State::Open);

        let mut ctx = EntryContext::new();
        assert!(base.from_open_to_half_open(&mut ctx));
        assert_eq!(base.current_state(), State::HalfOpen);
        ctx.set_result(TokenResult::new_blocked(
            BlockType::CircuitBreaking,
            "abc".into(),
        ));
        for handler in ctx.take_exit_handlers() {
            handler(&ctx);
        }
        assert_eq!(base.current_state(), State::Open);
        // the retry timer is untouched, the next call may probe at once
        assert!(base.retry_timeout_arrived());
    }

    #[test]
    fn passed_probe_keeps_half_open() {
        let base = Arc::new(BreakerBase::new(
            rule(BreakerStrategy::ErrorCount, 1.0),
            new_state_change_listeners(),
        ));
        base.set_state(State::Open);
        let mut ctx = EntryContext::new();
        assert!(base.from_open_to_half_open(&mut ctx));
        for handler in ctx.take_exit_handlers() {
            handler(&ctx);
        }
        assert_eq!(base.current_state(), State::HalfOpen);
    }

    #[test]
    fn single_probe_under_contention() {
        let breaker = Arc::new(SlowRtBreaker::new(
            rule(BreakerStrategy::SlowRequestRatio, 0.5),
            new_state_change_listeners(),
        )
        .unwrap());
        breaker.breaker().set_state(State::Open);
        let mut handles = Vec::new();
        for _ in 0..32 {
            let breaker = breaker.clone();
            handles.push(thread::spawn(move || {
                let mut ctx = EntryContext::new();
                breaker.try_pass(&mut ctx)
            }));
        }
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|passed| *passed)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(breaker.current_state(), State::HalfOpen);
        assert!(!breaker.try_pass(&mut EntryContext::new()));
    }
}
