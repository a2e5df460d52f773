use super::{EntryContext, ExitHandler, ResourceWrapper, SlotChain};
use crate::utils::time::curr_time_millis;
use crate::Error;
use std::fmt;
use std::sync::Arc;

/// SentinelEntry is the handle of one admitted call.
/// The call owns it exclusively; `exit()` unwinds the slot chain exactly once.
/// An entry dropped without `exit()` (e.g. the guarded code panicked or returned early)
/// exits on drop, so statistics stay balanced.
pub struct SentinelEntry {
    ctx: EntryContext,
    /// each entry traverses a slot chain,
    /// the chain is shared by all the entries, thus here we use Arc
    sc: Arc<SlotChain>,
    exited: bool,
}

impl SentinelEntry {
    pub fn new(ctx: EntryContext, sc: Arc<SlotChain>) -> Self {
        SentinelEntry {
            ctx,
            sc,
            exited: false,
        }
    }

    pub fn when_exit(&mut self, exit_handler: ExitHandler) {
        self.ctx.when_exit(exit_handler);
    }

    pub fn context(&self) -> &EntryContext {
        &self.ctx
    }

    pub fn resource(&self) -> &ResourceWrapper {
        self.ctx.resource()
    }

    /// Records the business error of the guarded call,
    /// the error is accounted for when the entry exits.
    pub fn set_err(&mut self, err: Error) {
        self.ctx.set_err(err);
    }

    pub fn exit(mut self) {
        self.exit_once();
    }

    fn exit_once(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        self.ctx.set_complete_time(curr_time_millis());
        self.sc.exit(&mut self.ctx);
    }
}

impl fmt::Debug for SentinelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentinelEntry")
            .field("resource", self.ctx.resource())
            .field("exited", &self.exited)
            .finish()
    }
}

impl Drop for SentinelEntry {
    fn drop(&mut self) {
        // a call unwinding out of the guarded code counts as failed
        if !self.exited && std::thread::panicking() && self.ctx.get_err().is_none() {
            self.ctx
                .set_err(Error::msg("the guarded call panicked before the entry exited"));
        }
        self.exit_once();
    }
}
