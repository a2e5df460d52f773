use sentinel_guard::{config::ConfigEntity, Sentinel};

mod circuit_breaker;
mod flow;
mod registry;
mod system;

/// A runtime reading the system clock, without the status collector.
fn sentinel() -> Sentinel {
    let mut entity = ConfigEntity::new();
    entity.config.use_cache_time = false;
    entity.config.stat.system.system_interval_ms = 0;
    Sentinel::new(entity).unwrap()
}
