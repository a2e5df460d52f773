use super::{build_default_slot_chain, EntryBuilder, SlotChainParts};
use crate::{
    authority::AuthoritySlot,
    base::SlotChain,
    circuitbreaker::CircuitBreakerManager,
    config::{self, ConfigEntity},
    flow::FlowRuleManager,
    logging,
    stat::{NodeRegistry, StatParams},
    system::SystemRuleManager,
    system_metric::{SysinfoMetricSource, SystemMetricSource, SystemStatus, SystemStatusCollector},
    utils, Result,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

/// Sentinel is the runtime of the traffic protection core.
/// It owns the statistics, the rule managers and the slot chain assembled from them,
/// as well as the background system status collector.
pub struct Sentinel {
    config: ConfigEntity,
    registry: Arc<NodeRegistry>,
    circuit_breaker_manager: Arc<CircuitBreakerManager>,
    system_rule_manager: Arc<SystemRuleManager>,
    flow_rule_manager: Arc<FlowRuleManager>,
    authority_slot: Arc<AuthoritySlot>,
    system_status: Arc<SystemStatus>,
    metric_source: Arc<dyn SystemMetricSource>,
    slot_chain: Arc<SlotChain>,
    collector: Mutex<Option<SystemStatusCollector>>,
    ticker_started: AtomicBool,
}

impl Sentinel {
    /// `init_default` builds and starts a runtime with the configuration resolved from
    /// `SENTINEL_CONFIG_FILE_PATH`, or the default configuration.
    pub fn init_default() -> Result<Self> {
        Self::init_with_config_file("")
    }

    /// `init_with_config_file` builds and starts a runtime with the configuration in the YAML file.
    pub fn init_with_config_file(config_path: &str) -> Result<Self> {
        let entity = config::load_config(config_path)?;
        Self::init_with_config(entity)
    }

    /// `init_with_config` builds and starts a runtime with the given configuration.
    pub fn init_with_config(entity: ConfigEntity) -> Result<Self> {
        config::init_log(&entity)?;
        let sentinel = Self::new(entity)?;
        sentinel.start()?;
        Ok(sentinel)
    }

    /// `new` builds a runtime without starting its background work.
    pub fn new(entity: ConfigEntity) -> Result<Self> {
        entity.check()?;
        let registry = Arc::new(NodeRegistry::new(entity.stat_params())?);
        let parts = SlotChainParts {
            registry,
            authority_slot: Arc::new(AuthoritySlot::new()),
            system_rule_manager: Arc::new(SystemRuleManager::new()),
            system_status: Arc::new(SystemStatus::new()),
            flow_rule_manager: Arc::new(FlowRuleManager::new()),
            circuit_breaker_manager: Arc::new(CircuitBreakerManager::new()),
        };
        let slot_chain = Arc::new(build_default_slot_chain(&parts));
        Ok(Sentinel {
            config: entity,
            registry: parts.registry,
            circuit_breaker_manager: parts.circuit_breaker_manager,
            system_rule_manager: parts.system_rule_manager,
            flow_rule_manager: parts.flow_rule_manager,
            authority_slot: parts.authority_slot,
            system_status: parts.system_status,
            metric_source: Arc::new(SysinfoMetricSource::new()),
            slot_chain,
            collector: Mutex::new(None),
            ticker_started: AtomicBool::new(false),
        })
    }

    /// Replaces the source the status collector samples, it takes effect on the next `start()`.
    pub fn with_metric_source(mut self, source: Arc<dyn SystemMetricSource>) -> Self {
        self.metric_source = source;
        self
    }

    /// `start` launches the time ticker and the system status collector as configured.
    /// Starting a started runtime is a no-op.
    pub fn start(&self) -> Result<()> {
        if self.config.use_cache_time() && !self.ticker_started.swap(true, Ordering::SeqCst) {
            utils::start_time_ticker()?;
        }
        let interval_ms = self.config.system_stat_collect_interval_ms();
        let mut collector = self
            .collector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if interval_ms > 0 && collector.is_none() {
            *collector = Some(SystemStatusCollector::start(
                Duration::from_millis(interval_ms as u64),
                Arc::clone(&self.metric_source),
                Arc::clone(&self.system_status),
                Arc::clone(&self.system_rule_manager),
            )?);
        }
        logging::info!(
            "[Sentinel] Runtime of app {} started",
            self.config.app_name()
        );
        Ok(())
    }

    /// `shutdown` stops the background work of the runtime, the statistics and rules are kept.
    pub fn shutdown(&self) {
        let collector = self
            .collector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut collector) = collector {
            collector.stop();
        }
        if self.ticker_started.swap(false, Ordering::SeqCst) {
            utils::stop_time_ticker();
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(false, SystemStatusCollector::is_running)
    }

    /// `entry` starts describing a call against the resource.
    pub fn entry(&self, resource_name: &str) -> EntryBuilder {
        EntryBuilder::new(resource_name.into(), Arc::clone(&self.slot_chain))
    }

    /// `reset_statistics` rebuilds the statistics of every resource with new window parameters.
    pub fn reset_statistics(&self, params: StatParams) -> Result<()> {
        self.registry.reset_all(params)
    }

    pub fn config(&self) -> &ConfigEntity {
        &self.config
    }

    pub fn node_registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn circuit_breaker_manager(&self) -> &Arc<CircuitBreakerManager> {
        &self.circuit_breaker_manager
    }

    pub fn system_rule_manager(&self) -> &Arc<SystemRuleManager> {
        &self.system_rule_manager
    }

    pub fn flow_rule_manager(&self) -> &Arc<FlowRuleManager> {
        &self.flow_rule_manager
    }

    pub fn authority_slot(&self) -> &Arc<AuthoritySlot> {
        &self.authority_slot
    }

    pub fn slot_chain(&self) -> &Arc<SlotChain> {
        &self.slot_chain
    }

    /// `system_status` returns the last sampled system load and CPU usage.
    pub fn system_status(&self) -> &SystemStatus {
        &self.system_status
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
