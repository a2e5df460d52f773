use crate::{base::SentinelRule, Error, Result};
use enum_map::Enum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The dimensions checked by the system protection guard, in checking order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
pub enum MetricType {
    /// InboundQps represents the passed QPS of all inbound requests.
    InboundQps,
    /// Concurrency represents the concurrency of all inbound requests.
    Concurrency,
    /// AvgRt represents the average response time of all inbound requests.
    AvgRt,
    /// Load represents system load1 in Linux/Unix.
    Load,
    /// CpuUsage represents the CPU usage of the system, in [0.0, 1.0].
    CpuUsage,
}

impl MetricType {
    /// The tag reported by a block of this dimension.
    pub fn reason_tag(&self) -> &'static str {
        match self {
            MetricType::InboundQps => "qps",
            MetricType::Concurrency => "thread",
            MetricType::AvgRt => "rt",
            MetricType::Load => "load",
            MetricType::CpuUsage => "cpu",
        }
    }
}

impl Default for MetricType {
    fn default() -> MetricType {
        MetricType::Load
    }
}

/// `Rule` describes the policy for system resiliency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Rule {
    /// `id` represents the unique ID of the rule (optional).
    pub id: String,
    /// `metric_type` indicates the type of the trigger metric.
    pub metric_type: MetricType,
    /// `threshold` is the upper bound of the metric.
    /// For `Load`, it is only the trigger of the BBR check.
    pub threshold: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            metric_type: MetricType::default(),
            threshold: 0.0,
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.metric_type == other.metric_type && self.threshold == other.threshold
    }
}

impl SentinelRule for Rule {
    fn resource_name(&self) -> String {
        format!("{:?}", self.metric_type)
    }

    fn is_valid(&self) -> Result<()> {
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::msg("negative threshold"));
        }
        if self.metric_type == MetricType::CpuUsage && self.threshold > 1.0 {
            return Err(Error::msg("invalid CPU usage, valid range is [0.0, 1.0]"));
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
