use crate::Result;
use std::fmt;

/// Common behaviour of the rules loaded into the rule managers.
pub trait SentinelRule: fmt::Debug + fmt::Display + Send + Sync {
    fn resource_name(&self) -> String;
    fn is_valid(&self) -> Result<()> {
        Ok(())
    }
}
