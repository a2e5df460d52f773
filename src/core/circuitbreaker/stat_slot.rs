use super::*;
use crate::base::{BaseSlot, EntryContext, Slot};
use std::sync::Arc;

pub const BREAKER_STAT_SLOT_ORDER: u32 = 6100;

/// MetricStatSlot feeds the outcome of completed invocations to the breakers of the resource.
/// MetricStatSlot must be filled into slot chain if circuit breaker is alive.
pub struct MetricStatSlot {
    manager: Arc<CircuitBreakerManager>,
}

impl MetricStatSlot {
    pub fn new(manager: Arc<CircuitBreakerManager>) -> Self {
        MetricStatSlot { manager }
    }
}

impl BaseSlot for MetricStatSlot {
    fn order(&self) -> u32 {
        BREAKER_STAT_SLOT_ORDER
    }
}

impl Slot for MetricStatSlot {
    fn exit(&self, ctx: &mut EntryContext) {
        if ctx.is_blocked() {
            return;
        }
        let rt = ctx.measure_round_trip();
        for cb in self.manager.get_breakers_of_resource(ctx.resource().name()) {
            cb.on_request_complete(rt, ctx.get_err());
        }
    }
}
