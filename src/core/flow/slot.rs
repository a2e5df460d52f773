use super::*;
use crate::base::{BaseSlot, BlockType, EntryContext, MetricEvent, Slot, StatNode, TokenResult};
use std::sync::Arc;

pub const FLOW_SLOT_ORDER: u32 = 5000;

/// FlowSlot rejects the calls beyond the flow rules of the resource.
pub struct FlowSlot {
    manager: Arc<FlowRuleManager>,
}

impl FlowSlot {
    pub fn new(manager: Arc<FlowRuleManager>) -> Self {
        FlowSlot { manager }
    }
}

impl BaseSlot for FlowSlot {
    fn order(&self) -> u32 {
        FLOW_SLOT_ORDER
    }
}

impl Slot for FlowSlot {
    fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        let node = match ctx.stat_node() {
            Some(node) => node,
            None => return TokenResult::new_pass(),
        };
        let batch = ctx.input().batch_count() as f64;
        for rule in self.manager.get_rules_of_resource(ctx.resource().name()) {
            let current = current_of(node.as_ref(), rule.metric_type);
            if current + batch > rule.threshold {
                return TokenResult::new_blocked_with_cause(
                    BlockType::Flow,
                    rule.resource.clone(),
                    "flow reject check blocked".into(),
                    rule,
                    Arc::new(current),
                );
            }
        }
        TokenResult::new_pass()
    }
}

fn current_of(node: &dyn StatNode, metric_type: MetricType) -> f64 {
    match metric_type {
        MetricType::Qps => node.qps(MetricEvent::Pass),
        MetricType::Concurrency => node.current_concurrency() as f64,
    }
}
