use super::Sentinel;
use crate::{
    base::{MetricItem, ResourceType, ResourceWrapper, TrafficType, TOTAL_IN_BOUND_RESOURCE_NAME},
    circuitbreaker::{Rule, State},
    system::SystemThresholds,
};
use std::sync::Arc;

/// The state of one circuit breaker of a resource.
#[derive(Debug, Clone)]
pub struct BreakerStatus {
    pub rule: Arc<Rule>,
    pub state: State,
    /// the value which tripped the breaker the last time, 0 if it never tripped
    pub trip_snapshot: f64,
}

/// The read-only query surface, for observability and dashboards.
impl Sentinel {
    /// `resource_metrics` returns the metrics of the resource, one item per traffic direction it was called in.
    pub fn resource_metrics(&self, name: &str) -> Vec<MetricItem> {
        [TrafficType::Inbound, TrafficType::Outbound]
            .into_iter()
            .filter_map(|traffic_type| {
                self.node_registry()
                    .get_resource_node(name, traffic_type)
                    .map(|node| {
                        let res = ResourceWrapper::new(
                            name.into(),
                            node.resource_type(),
                            traffic_type,
                        );
                        MetricItem::from_node(&res, node.as_ref())
                    })
            })
            .collect()
    }

    pub fn all_resource_metrics(&self) -> Vec<MetricItem> {
        self.node_registry()
            .all_nodes()
            .iter()
            .map(|(res, node)| MetricItem::from_node(res, node.as_ref()))
            .collect()
    }

    /// `inbound_metrics` returns the metrics of all inbound traffic as a whole.
    pub fn inbound_metrics(&self) -> MetricItem {
        let res = ResourceWrapper::new(
            TOTAL_IN_BOUND_RESOURCE_NAME.into(),
            ResourceType::Common,
            TrafficType::Inbound,
        );
        MetricItem::from_node(&res, self.node_registry().inbound_node().as_ref())
    }

    pub fn breaker_states(&self, name: &str) -> Vec<BreakerStatus> {
        self.circuit_breaker_manager()
            .get_breakers_of_resource(name)
            .iter()
            .map(|cb| BreakerStatus {
                rule: Arc::clone(cb.bound_rule()),
                state: cb.current_state(),
                trip_snapshot: cb.trip_snapshot(),
            })
            .collect()
    }

    /// `system_thresholds` returns the system rules in force.
    pub fn system_thresholds(&self) -> Arc<SystemThresholds> {
        self.system_rule_manager().thresholds()
    }
}
