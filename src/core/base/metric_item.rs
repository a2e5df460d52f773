//! Metric Item
//!

use super::{MetricEvent, ResourceWrapper, StatNode, TrafficType};
use crate::utils::{curr_time_millis, format_time_millis};
use std::fmt;

pub const METRIC_PART_SEPARATOR: &str = "|";

/// MetricItem is a read-only, point-in-time view on the statistics of one node.
/// Rates are read from the per-second sliding window, totals are cumulative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricItem {
    pub resource: String,
    pub traffic_type: TrafficType,
    pub timestamp: u64,
    pub pass_qps: f64,
    pub block_qps: f64,
    pub complete_qps: f64,
    pub error_qps: f64,
    pub avg_rt: f64,
    pub min_rt: f64,
    pub concurrency: u32,
    pub max_success_qps: f64,
    pub pass_total: u64,
    pub block_total: u64,
    pub complete_total: u64,
    pub error_total: u64,
}

impl MetricItem {
    pub fn from_node(resource: &ResourceWrapper, node: &dyn StatNode) -> Self {
        MetricItem {
            resource: resource.name().clone(),
            traffic_type: *resource.traffic_type(),
            timestamp: curr_time_millis(),
            pass_qps: node.qps(MetricEvent::Pass),
            block_qps: node.qps(MetricEvent::Block),
            complete_qps: node.qps(MetricEvent::Complete),
            error_qps: node.qps(MetricEvent::Error),
            avg_rt: node.avg_rt(),
            min_rt: node.min_rt(),
            concurrency: node.current_concurrency(),
            max_success_qps: node.max_success_qps(),
            pass_total: node.total(MetricEvent::Pass),
            block_total: node.total(MetricEvent::Block),
            complete_total: node.total(MetricEvent::Complete),
            error_total: node.total(MetricEvent::Error),
        }
    }
}

impl fmt::Display for MetricItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time_str = format_time_millis(self.timestamp);
        let final_name = self.resource.replace(METRIC_PART_SEPARATOR, "_");
        write!(
            f,
            "{}|{}|{}|{:?}|{:.2}|{:.2}|{:.2}|{:.2}|{:.2}|{}|{:.2}",
            self.timestamp,
            time_str,
            final_name,
            self.traffic_type,
            self.pass_qps,
            self.block_qps,
            self.complete_qps,
            self.error_qps,
            self.avg_rt,
            self.concurrency,
            self.max_success_qps,
        )
    }
}
