use crate::base::{
    BlockError, EntryContext, ResourceType, ResourceWrapper, SentinelEntry, SentinelInput,
    SlotChain, TokenResult, TrafficType,
};
use crate::Error;
use std::sync::Arc;

/// EntryBuilder is the basic API of Sentinel.
/// It describes one call against a resource and runs it through the slot chain.
pub struct EntryBuilder {
    resource_name: String,
    resource_type: ResourceType,
    traffic_type: TrafficType,
    batch_count: u32,
    origin: Option<String>,
    slot_chain: Arc<SlotChain>,
}

impl EntryBuilder {
    pub fn new(resource_name: String, slot_chain: Arc<SlotChain>) -> Self {
        EntryBuilder {
            resource_name,
            resource_type: ResourceType::default(),
            traffic_type: TrafficType::default(),
            batch_count: 1,
            origin: None,
            slot_chain,
        }
    }

    /// `build()` would consume EntryBuilder.
    /// A blocked call has already exited when the `BlockError` is returned.
    pub fn build(self) -> Result<SentinelEntry, BlockError> {
        let mut ctx = EntryContext::new();
        ctx.set_resource(ResourceWrapper::new(
            self.resource_name,
            self.resource_type,
            self.traffic_type,
        ));
        ctx.set_input(SentinelInput::new(self.batch_count, self.origin));

        let r = self.slot_chain.entry(&mut ctx);
        let entry = SentinelEntry::new(ctx, self.slot_chain);
        match r {
            TokenResult::Blocked(block_err) => {
                entry.exit();
                Err(block_err)
            }
            TokenResult::Pass => Ok(entry),
        }
    }

    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    pub fn with_traffic_type(mut self, traffic_type: TrafficType) -> Self {
        self.traffic_type = traffic_type;
        self
    }

    pub fn with_batch_count(mut self, batch_count: u32) -> Self {
        self.batch_count = batch_count;
        self
    }

    /// `origin` is the caller of the call, checked by the authority slot and counted on its own node.
    pub fn with_origin(mut self, origin: String) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// `trace_error` records the business error of the guarded call,
/// it is counted by the statistics and the circuit breakers when the entry exits.
pub fn trace_error(entry: &mut SentinelEntry, err: Error) {
    entry.set_err(err);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{BlockType, MockSlot};
    use mockall::*;

    fn slot(order: u32) -> MockSlot {
        let mut s = MockSlot::new();
        s.expect_order().return_const(order);
        s
    }

    #[test]
    fn pass() {
        let mut seq = Sequence::new();
        let mut first = slot(0);
        let mut second = slot(1);
        first
            .expect_entry()
            .once()
            .in_sequence(&mut seq)
            .withf(|ctx: &EntryContext| {
                ctx.input().batch_count() == 2 && ctx.input().origin() == Some("app-a")
            })
            .returning(|_| TokenResult::new_pass());
        second
            .expect_entry()
            .once()
            .in_sequence(&mut seq)
            .returning(|_| TokenResult::new_pass());
        first
            .expect_on_entry_settled()
            .once()
            .in_sequence(&mut seq)
            .return_const(());
        second
            .expect_on_entry_settled()
            .once()
            .in_sequence(&mut seq)
            .return_const(());
        first
            .expect_exit()
            .once()
            .in_sequence(&mut seq)
            .withf(|ctx: &EntryContext| ctx.get_err().is_some())
            .return_const(());
        second
            .expect_exit()
            .once()
            .in_sequence(&mut seq)
            .return_const(());

        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(first));
        sc.add_slot(Arc::new(second));
        let mut entry = EntryBuilder::new("abc".into(), Arc::new(sc))
            .with_traffic_type(TrafficType::Inbound)
            .with_batch_count(2)
            .with_origin("app-a".into())
            .build()
            .unwrap();
        assert_eq!("abc", entry.resource().name());
        assert!(entry.resource().is_inbound());
        trace_error(&mut entry, Error::msg("biz error"));
        entry.exit();
    }

    #[test]
    fn block() {
        let mut first = slot(0);
        let mut blocking = slot(1);
        let mut skipped = slot(2);
        first
            .expect_entry()
            .once()
            .returning(|_| TokenResult::new_pass());
        first.expect_on_entry_settled().once().return_const(());
        first.expect_exit().once().return_const(());
        blocking
            .expect_entry()
            .once()
            .returning(|ctx| TokenResult::new_blocked(BlockType::Flow, ctx.resource().name().clone()));
        blocking.expect_on_entry_settled().once().return_const(());
        blocking.expect_exit().once().return_const(());
        skipped.expect_entry().never();
        skipped.expect_exit().never();

        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(first));
        sc.add_slot(Arc::new(blocking));
        sc.add_slot(Arc::new(skipped));
        let block_err = EntryBuilder::new("abc".into(), Arc::new(sc))
            .build()
            .err()
            .unwrap();
        assert_eq!(block_err.block_type(), BlockType::Flow);
        assert_eq!(block_err.resource(), "abc");
    }
}
