use super::{EntryContext, TokenResult, SLOT_INIT};
use crate::utils::AsAny;
use std::any::Any;
use std::sync::Arc;

/// trait `PartialOrd` is not object safe
/// SlotChain will sort all it's slots by ascending sort value
pub trait BaseSlot: Any + AsAny + Sync + Send {
    /// order returns the sort value of the slot.
    fn order(&self) -> u32 {
        0
    }
}

/// Slot is one stage of the check/record pipeline.
/// All the hooks of a slot are invoked in the ascending order of the slots,
/// `on_entry_settled` and `exit` only reach the slots whose `entry` ran.
pub trait Slot: BaseSlot {
    /// entry prepares the statistic structures or checks the rules of the slot.
    /// A blocked result breaks off the pipeline, later slots are skipped.
    fn entry(&self, _ctx: &mut EntryContext) -> TokenResult {
        TokenResult::new_pass()
    }
    /// on_entry_settled is invoked once the outcome of the entry is known,
    /// `ctx.result()` tells whether the call passed or was blocked.
    fn on_entry_settled(&self, _ctx: &EntryContext) {}
    /// exit is invoked when the entry exits, for blocked entries as well.
    /// Slots recording statistics of the guarded call must check `ctx.is_blocked()`.
    fn exit(&self, _ctx: &mut EntryContext) {}
}

/// SlotChain holds the ordered slots of the pipeline.
/// Slots are registered before the chain is shared, the chain is read-only afterwards.
pub struct SlotChain {
    /// in ascending order by Slot.order() value, registration order breaks ties.
    pub(self) slots: Vec<Arc<dyn Slot>>,
}

impl Default for SlotChain {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(SLOT_INIT),
        }
    }
}

impl SlotChain {
    pub fn new() -> Self {
        Default::default()
    }

    /// add_slot adds the slot to the SlotChain.
    /// All slots in the list will be sorted according to Slot.order() in ascending order.
    pub fn add_slot(&mut self, s: Arc<dyn Slot>) {
        self.slots.push(s);
        self.slots.sort_by_key(|a| a.order());
    }

    pub fn slots(&self) -> &[Arc<dyn Slot>] {
        &self.slots
    }

    /// The entrance of slot chain
    /// Return the TokenResult
    pub fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        ctx.reset_result_to_pass();
        ctx.entered_slots = 0;
        for s in &self.slots {
            let res = s.entry(ctx);
            ctx.entered_slots += 1;
            if res.is_blocked() {
                ctx.set_result(res);
                break;
            }
        }
        for s in &self.slots[..ctx.entered_slots] {
            s.on_entry_settled(ctx);
        }
        ctx.result().clone()
    }

    /// Unwinds the slots which took part in the entry, then runs the exit handlers.
    pub fn exit(&self, ctx: &mut EntryContext) {
        let entered = ctx.entered_slots.min(self.slots.len());
        for s in &self.slots[..entered] {
            s.exit(ctx);
        }
        for handler in ctx.take_exit_handlers() {
            handler(ctx);
        }
    }
}

#[cfg(test)]
pub(crate) use test::MockSlot;
