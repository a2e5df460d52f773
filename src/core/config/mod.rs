//! Configuration of the `Sentinel` runtime, loaded from YAML and overridden by the system environment.

pub mod base;
pub mod constant;
pub mod entity;

pub use base::*;
pub use constant::*;
pub use entity::*;
