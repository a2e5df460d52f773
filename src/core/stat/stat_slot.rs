use super::NodeRegistry;
use crate::base::{BaseSlot, EntryContext, MetricEvent, Slot, StatNode};
use std::sync::Arc;

pub const STAT_SLOT_ORDER: u32 = 2000;

/// ResourceNodeStatSlot records the outcome of every call into the resource node,
/// the origin node and, for inbound traffic, the global inbound node.
#[derive(Debug)]
pub struct ResourceNodeStatSlot {
    registry: Arc<NodeRegistry>,
}

impl ResourceNodeStatSlot {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        ResourceNodeStatSlot { registry }
    }

    fn nodes_of(&self, ctx: &EntryContext) -> Vec<Arc<dyn StatNode>> {
        let mut nodes = Vec::with_capacity(3);
        if let Some(node) = ctx.stat_node() {
            nodes.push(node);
        } else {
            return nodes;
        }
        if let Some(origin) = ctx.origin_node() {
            nodes.push(origin);
        }
        if ctx.resource().is_inbound() {
            nodes.push(self.registry.inbound_node());
        }
        nodes
    }

    fn record_pass_for(&self, node: &dyn StatNode, count: u32) {
        node.increase_concurrency();
        node.add_count(MetricEvent::Pass, count as u64);
    }

    fn record_block_for(&self, node: &dyn StatNode, count: u32) {
        node.add_count(MetricEvent::Block, count as u64)
    }

    fn record_complete_for(&self, node: &dyn StatNode, count: u32, round_trip: u64, failed: bool) {
        node.add_count(MetricEvent::Rt, round_trip);
        node.add_count(MetricEvent::Complete, count as u64);
        if failed {
            node.add_count(MetricEvent::Error, count as u64);
        }
        node.decrease_concurrency();
    }
}

impl BaseSlot for ResourceNodeStatSlot {
    fn order(&self) -> u32 {
        STAT_SLOT_ORDER
    }
}

impl Slot for ResourceNodeStatSlot {
    fn on_entry_settled(&self, ctx: &EntryContext) {
        let count = ctx.input().batch_count();
        let blocked = ctx.is_blocked();
        for node in self.nodes_of(ctx) {
            if blocked {
                self.record_block_for(node.as_ref(), count);
            } else {
                self.record_pass_for(node.as_ref(), count);
            }
        }
    }

    fn exit(&self, ctx: &mut EntryContext) {
        // blocked calls never ran, nothing to complete
        if ctx.is_blocked() {
            return;
        }
        let round_trip = ctx.measure_round_trip();
        ctx.set_round_trip(round_trip);
        let count = ctx.input().batch_count();
        let failed = ctx.get_err().is_some();
        for node in self.nodes_of(ctx) {
            self.record_complete_for(node.as_ref(), count, round_trip, failed);
        }
    }
}
