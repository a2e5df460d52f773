/// Name of the node aggregating all inbound calls, the one the system guard reads.
pub const TOTAL_IN_BOUND_RESOURCE_NAME: &str = "__total_inbound_traffic__";

/// Above this many resources the registry warns once, it never refuses new ones.
pub const DEFAULT_MAX_RESOURCE_AMOUNT: usize = 10000;

/// The read-only per-second view: 2 buckets of 500ms.
pub const DEFAULT_SAMPLE_COUNT: u32 = 2;
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

/// The underlying bucket array of a node: 20 buckets over 10s, 500ms each.
pub const DEFAULT_SAMPLE_COUNT_TOTAL: u32 = 20;
pub const DEFAULT_INTERVAL_MS_TOTAL: u32 = 10000;

/// Upper bound of a recorded response time, also the min-RT of an empty bucket.
pub const DEFAULT_STATISTIC_MAX_RT: u64 = 60000;

/// initial capacity of the slot chain
pub const SLOT_INIT: usize = 8;
