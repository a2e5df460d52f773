use super::{BlockType, SentinelRule};
use crate::utils;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub trait SnapshotTrait: Any + fmt::Debug + utils::AsAny + Send + Sync {}
impl<T: Any + fmt::Debug + utils::AsAny + Send + Sync> SnapshotTrait for T {}
pub type Snapshot = dyn SnapshotTrait;

/// BlockError indicates the request was blocked by Sentinel.
/// It is the outcome of a blocked call, not an internal failure.
#[derive(Debug, Clone)]
pub struct BlockError {
    block_type: BlockType,
    resource: String,
    // block_msg provides additional message for the block error.
    block_msg: String,
    rule: Option<Arc<dyn SentinelRule>>,
    // snapshot_value represents the triggered "snapshot" value
    snapshot_value: Option<Arc<Snapshot>>,
}

impl PartialEq for BlockError {
    fn eq(&self, other: &BlockError) -> bool {
        self.block_type == other.block_type
            && self.resource == other.resource
            && self.block_msg == other.block_msg
    }
}

impl BlockError {
    pub fn new(block_type: BlockType, resource: String) -> Self {
        Self {
            block_type,
            resource,
            block_msg: String::new(),
            rule: None,
            snapshot_value: None,
        }
    }

    pub fn new_with_msg(block_type: BlockType, resource: String, block_msg: String) -> Self {
        Self {
            block_msg,
            ..Self::new(block_type, resource)
        }
    }

    pub fn new_with_cause(
        block_type: BlockType,
        resource: String,
        block_msg: String,
        rule: Arc<dyn SentinelRule>,
        snapshot_value: Arc<Snapshot>,
    ) -> Self {
        Self {
            block_type,
            resource,
            block_msg,
            rule: Some(rule),
            snapshot_value: Some(snapshot_value),
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// `flow`, `degrade`, `system:<dimension>` or `authority`
    pub fn cause(&self) -> String {
        self.block_type.cause()
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn block_msg(&self) -> &str {
        &self.block_msg
    }

    pub fn triggered_rule(&self) -> Option<Arc<dyn SentinelRule>> {
        self.rule.clone()
    }

    pub fn triggered_value(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_value.clone()
    }

    /// The snapshot value downcast to its concrete type.
    pub fn triggered_value_as<T: Any>(&self) -> Option<&T> {
        self.snapshot_value
            .as_deref()
            .and_then(|value| value.as_any().downcast_ref::<T>())
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.block_msg.is_empty() {
            write!(
                f,
                "SentinelBlockError: {}, resource: {}",
                self.block_type, self.resource
            )
        } else {
            write!(
                f,
                "SentinelBlockError: {}, resource: {}, message: {}",
                self.block_type, self.resource, self.block_msg
            )
        }
    }
}

impl std::error::Error for BlockError {}
