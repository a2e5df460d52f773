//! The `stat` mod implements the statistic slots and the basic data structures,
//! such as the sliding window and its underlying LeapArray.
mod base;
mod node_storage;
mod resource_node;
mod stat_prepare_slot;
mod stat_slot;

pub use base::*;
pub use node_storage::*;
pub use resource_node::*;
pub use stat_prepare_slot::*;
pub use stat_slot::*;
