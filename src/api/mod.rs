//! mod `api` provides the topmost fundamental APIs for users using sentinel-guard.
//! Users build a `Sentinel` runtime before loading rules. There are three ways to build it:
//!
//!  1. `Sentinel::init_default()`, using the configuration resolved from the system environment, or the defaults.
//!  2. `Sentinel::init_with_config(config_entity: ConfigEntity)`, using a customized `ConfigEntity`.
//!  3. `Sentinel::init_with_config_file(config_path: &str)`, using a YAML file.
//!
//! Each runtime owns its statistics, rule managers and slot chain, several runtimes never share state.

mod base;
mod init;
mod query;
mod slot_chain;

pub use base::*;
pub use init::*;
pub use query::*;
pub use slot_chain::*;
