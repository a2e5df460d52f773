//! mod `system` provides implementation of adaptive system protection.
//! It guards all the inbound traffic with the global inbound statistic
//! and the system load and CPU usage sampled in the background.

pub mod rule;
pub mod rule_manager;
pub mod slot;

pub use rule::*;
pub use rule_manager::*;
pub use slot::*;
