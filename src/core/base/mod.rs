//! Fundamental types shared by the statistic structures, the rule managers and the slots.

mod block_error;
pub mod constant;
mod context;
mod entry;
mod metric_item;
mod resource;
mod result;
mod rule;
mod slot_chain;
mod stat;

pub use block_error::*;
pub use constant::*;
pub use context::*;
pub use entry::*;
pub use metric_item::*;
pub use resource::*;
pub use result::*;
pub use rule::*;
pub use slot_chain::*;
pub use stat::*;
