pub mod base;
pub mod system_metric;
// statistic preparation slots, statistic slots
pub mod stat;
// rule check slots
pub mod authority;
// statistic slots, rule check slots
pub mod circuitbreaker;
pub mod config;
// rule check slots
pub mod flow;
pub mod system;
