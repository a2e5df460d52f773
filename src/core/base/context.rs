//! Context
//!
use super::{BlockError, ResourceWrapper, StatNode, TokenResult};
use crate::utils::time::curr_time_millis;
use crate::Error;
use std::sync::Arc;

/// Invoked once after all the slots exited.
pub type ExitHandler = Box<dyn FnOnce(&EntryContext) + Send>;

/// EntryContext is the record of one in-flight call.
/// It is owned by the `SentinelEntry` of that call and handed to every slot of the chain.
#[derive(Default)]
pub struct EntryContext {
    /// Use to calculate RT
    start_time: u64,
    /// 0 until the call exits
    complete_time: u64,
    /// The round trip time of this transaction
    round_trip: u64,
    resource: ResourceWrapper,
    input: SentinelInput,
    stat_node: Option<Arc<dyn StatNode>>,
    /// the node of the caller origin under `stat_node`
    origin_node: Option<Arc<dyn StatNode>>,
    /// the result of rule slots check
    rule_check_result: TokenResult,
    /// the business error of the guarded call
    err: Option<Error>,
    exit_handlers: Vec<ExitHandler>,
    /// how many slots of the chain ran their entry hook
    pub(crate) entered_slots: usize,
}

impl EntryContext {
    pub fn new() -> Self {
        EntryContext {
            start_time: curr_time_millis(),
            ..Default::default()
        }
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: u64) {
        self.start_time = start_time;
    }

    pub fn complete_time(&self) -> u64 {
        self.complete_time
    }

    pub fn set_complete_time(&mut self, complete_time: u64) {
        self.complete_time = complete_time;
    }

    /// `complete_time - start_time`, with an unset complete time read as now.
    pub fn measure_round_trip(&self) -> u64 {
        let complete_time = if self.complete_time == 0 {
            curr_time_millis()
        } else {
            self.complete_time
        };
        complete_time.saturating_sub(self.start_time)
    }

    pub fn set_round_trip(&mut self, round_trip: u64) {
        self.round_trip = round_trip
    }

    pub fn round_trip(&self) -> u64 {
        self.round_trip
    }

    pub fn is_blocked(&self) -> bool {
        self.rule_check_result.is_blocked()
    }

    pub fn block_cause(&self) -> Option<&BlockError> {
        self.rule_check_result.block_err()
    }

    pub fn set_resource(&mut self, resource: ResourceWrapper) {
        self.resource = resource;
    }

    pub fn resource(&self) -> &ResourceWrapper {
        &self.resource
    }

    pub fn set_input(&mut self, input: SentinelInput) {
        self.input = input;
    }

    pub fn input(&self) -> &SentinelInput {
        &self.input
    }

    pub fn set_stat_node(&mut self, stat_node: Arc<dyn StatNode>) {
        self.stat_node = Some(stat_node);
    }

    pub fn stat_node(&self) -> Option<Arc<dyn StatNode>> {
        self.stat_node.clone()
    }

    pub fn set_origin_node(&mut self, origin_node: Arc<dyn StatNode>) {
        self.origin_node = Some(origin_node);
    }

    pub fn origin_node(&self) -> Option<Arc<dyn StatNode>> {
        self.origin_node.clone()
    }

    pub fn set_result(&mut self, result: TokenResult) {
        self.rule_check_result = result;
    }

    pub fn reset_result_to_pass(&mut self) {
        self.rule_check_result.reset_to_pass();
    }

    pub fn result(&self) -> &TokenResult {
        &self.rule_check_result
    }

    pub fn set_err(&mut self, err: Error) {
        self.err = Some(err);
    }

    pub fn get_err(&self) -> &Option<Error> {
        &self.err
    }

    /// Registers a handler invoked after the slots exited, in registration order.
    pub fn when_exit(&mut self, handler: ExitHandler) {
        self.exit_handlers.push(handler);
    }

    pub(crate) fn take_exit_handlers(&mut self) -> Vec<ExitHandler> {
        std::mem::take(&mut self.exit_handlers)
    }
}

/// Input of policy algorithms
#[derive(Debug, Clone)]
pub struct SentinelInput {
    batch_count: u32,
    /// the caller origin, if known
    origin: Option<String>,
}

impl Default for SentinelInput {
    fn default() -> Self {
        SentinelInput {
            batch_count: 1,
            origin: None,
        }
    }
}

impl SentinelInput {
    pub fn new(batch_count: u32, origin: Option<String>) -> Self {
        SentinelInput {
            batch_count,
            origin,
        }
    }

    pub fn set_batch_count(&mut self, batch_count: u32) {
        self.batch_count = batch_count;
    }

    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }

    pub fn set_origin(&mut self, origin: String) {
        self.origin = Some(origin);
    }

    /// empty origins are reported as absent
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref().filter(|o| !o.is_empty())
    }
}
