use crate::{
    authority::AuthoritySlot,
    base::SlotChain,
    circuitbreaker::{CircuitBreakerManager, CircuitBreakerSlot, MetricStatSlot},
    flow::{FlowRuleManager, FlowSlot},
    stat::{NodeRegistry, ResourceNodePrepareSlot, ResourceNodeStatSlot},
    system::{AdaptiveSlot, SystemRuleManager},
    system_metric::SystemStatus,
};
use std::sync::Arc;

/// The collaborators the default slots are built on.
pub struct SlotChainParts {
    pub registry: Arc<NodeRegistry>,
    pub authority_slot: Arc<AuthoritySlot>,
    pub system_rule_manager: Arc<SystemRuleManager>,
    pub system_status: Arc<SystemStatus>,
    pub flow_rule_manager: Arc<FlowRuleManager>,
    pub circuit_breaker_manager: Arc<CircuitBreakerManager>,
}

/// `build_default_slot_chain` assembles the statistic and rule check slots:
/// node preparation, statistics, authority, system, flow, circuit breaker check and circuit breaker statistics.
pub fn build_default_slot_chain(parts: &SlotChainParts) -> SlotChain {
    let mut sc = SlotChain::new();
    sc.add_slot(Arc::new(ResourceNodePrepareSlot::new(Arc::clone(
        &parts.registry,
    ))));
    sc.add_slot(Arc::new(ResourceNodeStatSlot::new(Arc::clone(
        &parts.registry,
    ))));
    sc.add_slot(parts.authority_slot.clone());
    sc.add_slot(Arc::new(AdaptiveSlot::new(
        Arc::clone(&parts.system_rule_manager),
        Arc::clone(&parts.registry),
        Arc::clone(&parts.system_status),
    )));
    sc.add_slot(Arc::new(FlowSlot::new(Arc::clone(&parts.flow_rule_manager))));
    sc.add_slot(Arc::new(CircuitBreakerSlot::new(Arc::clone(
        &parts.circuit_breaker_manager,
    ))));
    sc.add_slot(Arc::new(MetricStatSlot::new(Arc::clone(
        &parts.circuit_breaker_manager,
    ))));
    sc
}
