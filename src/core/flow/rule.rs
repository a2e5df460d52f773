use crate::{base::SentinelRule, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The statistic a flow rule limits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    /// Qps limits the passed requests per second of the resource.
    Qps,
    /// Concurrency limits the in-flight requests of the resource.
    Concurrency,
}

impl Default for MetricType {
    fn default() -> MetricType {
        MetricType::Qps
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Rule describes the strategy of flow control, requests beyond the threshold are rejected directly.
pub struct Rule {
    /// `id` represents the unique ID of the rule (optional).
    pub id: String,
    /// `resource` represents the resource name.
    pub resource: String,
    pub metric_type: MetricType,
    /// `threshold` is the upper bound of the metric, a call is rejected when `current + batch` exceeds it.
    pub threshold: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            resource: String::default(),
            metric_type: MetricType::default(),
            threshold: 0.0,
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && self.metric_type == other.metric_type
            && self.threshold == other.threshold
    }
}

impl SentinelRule for Rule {
    fn resource_name(&self) -> String {
        self.resource.clone()
    }

    fn is_valid(&self) -> Result<()> {
        if self.resource.is_empty() {
            return Err(Error::msg("empty resource name"));
        }
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::msg("negative threshold"));
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", fmtted)
    }
}
