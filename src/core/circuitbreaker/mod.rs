//! `circuitbreaker` module implements the circuit breaker pattern, which refuses the calls
//! to a resource that keeps failing and probes for its recovery.
//!
//! Three strategies are supported out of the box:
//!
//!  1. SlowRequestRatio: the ratio of entries whose response time is greater than `max_allowed_rt_ms` exceeds the threshold.
//!
//!  2. ErrorRatio: the ratio of entries which ended with a business error exceeds the threshold.
//!
//!  3. ErrorCount: the number of entries which ended with a business error exceeds the threshold.
//!
//! Further strategies are plugged in as `BreakerStrategy::Custom` with a generator on the `CircuitBreakerManager`.
//! Each Rule is converted into a circuit breaker holding its own statistic.
//!
//! The breakers are state machines with three states:
//!
//!  1. Closed: all entries pass.
//!
//!  2. Open: all entries are blocked. After the retry timeout, the first entry switches the breaker to Half-Open and probes the resource.
//!
//!  3. Half-Open: only the probe is in flight, others are blocked. The outcome of the probe closes or re-opens the breaker.
//!
//! State changes are observable through `StateChangeListener`.

pub mod breaker;
pub mod rule;
pub mod rule_manager;
pub mod slot;
pub mod stat_slot;

pub use breaker::*;
pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
pub use stat_slot::*;
