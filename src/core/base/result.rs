//! Result
//!
use super::{BlockError, SentinelRule, Snapshot};
use crate::system::MetricType;
use std::fmt;
use std::sync::Arc;

/// The cause of a blocked call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Flow,
    Authority,
    CircuitBreaking,
    /// carries the system dimension that refused the call
    SystemFlow(MetricType),
}

impl BlockType {
    /// Short cause tag: `flow`, `degrade`, `system:<dimension>` or `authority`.
    pub fn cause(&self) -> String {
        match self {
            BlockType::Flow => "flow".into(),
            BlockType::Authority => "authority".into(),
            BlockType::CircuitBreaking => "degrade".into(),
            BlockType::SystemFlow(metric_type) => format!("system:{}", metric_type.reason_tag()),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::SystemFlow(metric_type) => write!(f, "SystemFlow({:?})", metric_type),
            _ => write!(f, "{:?}", self),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenResult {
    Pass,
    Blocked(BlockError),
}

impl Default for TokenResult {
    fn default() -> Self {
        TokenResult::Pass
    }
}

impl TokenResult {
    pub fn new_pass() -> Self {
        Self::default()
    }

    pub fn new_blocked(block_type: BlockType, resource: String) -> Self {
        Self::Blocked(BlockError::new(block_type, resource))
    }

    pub fn new_blocked_with_msg(block_type: BlockType, resource: String, block_msg: String) -> Self {
        Self::Blocked(BlockError::new_with_msg(block_type, resource, block_msg))
    }

    pub fn new_blocked_with_cause(
        block_type: BlockType,
        resource: String,
        block_msg: String,
        rule: Arc<dyn SentinelRule>,
        snapshot_value: Arc<Snapshot>,
    ) -> Self {
        Self::Blocked(BlockError::new_with_cause(
            block_type,
            resource,
            block_msg,
            rule,
            snapshot_value,
        ))
    }

    pub fn reset_to_pass(&mut self) {
        *self = Self::new_pass();
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    pub fn block_err(&self) -> Option<&BlockError> {
        match self {
            Self::Blocked(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenResult::Pass => write!(f, "TokenResult::Pass"),
            TokenResult::Blocked(block_err) => write!(f, "TokenResult::Blocked: {}", block_err),
        }
    }
}
