//! Direct-reject flow control: calls beyond the QPS or concurrency threshold of the resource are blocked.

pub mod rule;
pub mod rule_manager;
pub mod slot;

pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
