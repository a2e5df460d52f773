use super::*;
use crate::{
    base::{
        BaseSlot, BlockType, ConcurrencyStat, EntryContext, MetricEvent, ReadStat, Slot,
        StatNode, TokenResult,
    },
    stat::NodeRegistry,
    system_metric::SystemStatus,
};
use std::sync::Arc;

pub const SYSTEM_SLOT_ORDER: u32 = 4000;

/// AdaptiveSlot guards the inbound traffic as a whole against the system rules.
/// The dimensions are checked in the order qps, thread, rt, load, cpu and the first violated one blocks.
pub struct AdaptiveSlot {
    manager: Arc<SystemRuleManager>,
    registry: Arc<NodeRegistry>,
    status: Arc<SystemStatus>,
}

impl AdaptiveSlot {
    pub fn new(
        manager: Arc<SystemRuleManager>,
        registry: Arc<NodeRegistry>,
        status: Arc<SystemStatus>,
    ) -> Self {
        AdaptiveSlot {
            manager,
            registry,
            status,
        }
    }
}

impl BaseSlot for AdaptiveSlot {
    fn order(&self) -> u32 {
        SYSTEM_SLOT_ORDER
    }
}

impl Slot for AdaptiveSlot {
    fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        if !ctx.resource().is_inbound() {
            return TokenResult::new_pass();
        }
        let thresholds = self.manager.thresholds();
        let batch = ctx.input().batch_count();
        for rule in thresholds.iter() {
            if let Some(observed) = self.can_pass_check(rule, batch) {
                let metric_type = rule.metric_type;
                return TokenResult::new_blocked_with_cause(
                    BlockType::SystemFlow(metric_type),
                    ctx.resource().name().clone(),
                    format!("system {} check blocked", metric_type.reason_tag()),
                    rule.clone(),
                    Arc::new(observed),
                );
            }
        }
        TokenResult::new_pass()
    }
}

impl AdaptiveSlot {
    /// `None` indicates it passes
    /// `Some(value)` carries the observed value violating the rule
    fn can_pass_check(&self, rule: &Rule, batch: u32) -> Option<f64> {
        let inbound = self.registry.inbound_node();
        let threshold = rule.threshold;
        match rule.metric_type {
            MetricType::InboundQps => {
                let qps = inbound.qps(MetricEvent::Pass);
                (qps + batch as f64 > threshold).then(|| qps)
            }
            MetricType::Concurrency => {
                let n = inbound.current_concurrency() as f64;
                (n > threshold).then(|| n)
            }
            MetricType::AvgRt => {
                let rt = inbound.avg_rt();
                (rt > threshold).then(|| rt)
            }
            MetricType::Load => {
                let load = self.status.current_load();
                (load > threshold && !check_bbr(inbound.as_ref())).then(|| load)
            }
            MetricType::CpuUsage => {
                let usage = self.status.current_cpu_usage();
                (usage > threshold).then(|| usage)
            }
        }
    }
}

/// Admits while the concurrency stays within the capacity estimated from
/// the best throughput and the best latency ever observed.
fn check_bbr(inbound: &dyn StatNode) -> bool {
    let concurrency = inbound.current_concurrency() as f64;
    concurrency <= 1.0
        || concurrency <= inbound.max_success_qps() * inbound.min_observed_rt() / 1000.0
}
