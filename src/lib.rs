#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Sentinel Guard
//!
//! An in-process traffic protection core. For every inbound or outbound call against a named
//! resource it decides whether to admit, degrade (circuit-break) or reject the call, based on
//! sliding-window runtime statistics and the loaded rules.
//!
//! Every call passes through the ordered slots of a `base::SlotChain`:
//! 1. the statistic preparation slot resolves the aggregate node of the resource,
//! 2. the statistic slot records pass/block counts, response time and concurrency,
//! 3. the authority, system, flow and circuit breaker slots check their rules.
//!
//! Generally, there are several steps when using Sentinel Guard:
//! 1. Build a `Sentinel` runtime from a configuration.
//! 2. Load the rules defined for each resource.
//! 3. Build an entry at the entry point of the protected code and exit it afterwards.
//!
//! ```rust
//! use sentinel_guard::{base, circuitbreaker, Sentinel};
//! use std::sync::Arc;
//!
//! let sentinel = Sentinel::init_default()?;
//! sentinel.circuit_breaker_manager().load_rules(vec![Arc::new(circuitbreaker::Rule {
//!     resource: "abc".into(),
//!     strategy: circuitbreaker::BreakerStrategy::SlowRequestRatio,
//!     retry_timeout_ms: 3000,
//!     min_request_amount: 10,
//!     stat_interval_ms: 5000,
//!     max_allowed_rt_ms: 50,
//!     threshold: 0.5,
//!     ..Default::default()
//! })]);
//! match sentinel.entry("abc").with_traffic_type(base::TrafficType::Inbound).build() {
//!     Ok(entry) => {
//!         // the request is allowed to be processed.
//!         entry.exit()
//!     }
//!     Err(block_err) => {
//!         // the request is blocked, `block_err.cause()` tells why.
//!     }
//! }
//! ```

/// Entry building and the `Sentinel` runtime.
pub mod api;
/// Core implementations, including the statistic structures,
/// such as the sliding window and its underlying LeapArray, the rule managers,
/// and the slots checking those rules.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
// Utility functions.
pub mod utils;

// re-export precludes
pub use crate::core::*;
pub use api::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
