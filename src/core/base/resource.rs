//! Resource/Traffic Wrappers
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// ResourceType represents the classification of the resources
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceType {
    Common = 0,
    Web,
    Rpc,
    ApiGateway,
    DbSql,
    Cache,
    MQ,
}

impl Default for ResourceType {
    fn default() -> ResourceType {
        ResourceType::Common
    }
}

impl From<u8> for ResourceType {
    fn from(num: u8) -> ResourceType {
        match num {
            1 => ResourceType::Web,
            2 => ResourceType::Rpc,
            3 => ResourceType::ApiGateway,
            4 => ResourceType::DbSql,
            5 => ResourceType::Cache,
            6 => ResourceType::MQ,
            _ => ResourceType::Common,
        }
    }
}

/// TrafficType describes the traffic type: Inbound or Outbound
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficType {
    Outbound,
    Inbound,
}

impl Default for TrafficType {
    fn default() -> TrafficType {
        TrafficType::Outbound
    }
}

/// ResourceWrapper identifies the protected resource of an invocation.
/// Two wrappers are the same resource when both the name and the traffic type match,
/// the resource type is only a classification tag.
#[derive(Debug, Clone, Default)]
pub struct ResourceWrapper {
    /// global unique resource name
    name: String,
    resource_type: ResourceType,
    /// Inbound or Outbound
    traffic_type: TrafficType,
}

impl PartialEq for ResourceWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.traffic_type == other.traffic_type
    }
}

impl Eq for ResourceWrapper {}

impl Hash for ResourceWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.traffic_type.hash(state);
    }
}

impl fmt::Display for ResourceWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResourceWrapper{{name={}, traffic_type={:?}, resource_type={:?}}}",
            self.name, self.traffic_type, self.resource_type
        )
    }
}

impl ResourceWrapper {
    pub fn new(name: String, resource_type: ResourceType, traffic_type: TrafficType) -> Self {
        ResourceWrapper {
            name,
            resource_type,
            traffic_type,
        }
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn traffic_type(&self) -> &TrafficType {
        &self.traffic_type
    }

    pub fn is_inbound(&self) -> bool {
        self.traffic_type == TrafficType::Inbound
    }
}
