//! Caller-origin admission. The matching of origins is up to the `AuthorityChecker` plugged into the slot.

pub mod slot;

pub use slot::*;
