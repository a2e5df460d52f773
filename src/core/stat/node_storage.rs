use super::{ResourceNode, StatParams};
use crate::{
    base::{
        ResourceType, ResourceWrapper, TrafficType, DEFAULT_MAX_RESOURCE_AMOUNT,
        TOTAL_IN_BOUND_RESOURCE_NAME,
    },
    logging, Result,
};
use arc_swap::ArcSwap;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// NodeRegistry lazily creates and caches one ResourceNode per resource identity.
/// Lookups of known resources never take a registry wide lock,
/// creation is an insert-if-absent on the owning shard.
#[derive(Debug)]
pub struct NodeRegistry {
    params: ArcSwap<StatParams>,
    inbound: Arc<ResourceNode>,
    nodes: DashMap<ResourceWrapper, Arc<ResourceNode>>,
    overflow_warned: AtomicBool,
}

impl NodeRegistry {
    pub fn new(params: StatParams) -> Result<Self> {
        params.check()?;
        let inbound = Arc::new(ResourceNode::new(
            TOTAL_IN_BOUND_RESOURCE_NAME.into(),
            ResourceType::Common,
            params,
        )?);
        Ok(NodeRegistry {
            params: ArcSwap::from_pointee(params),
            inbound,
            nodes: DashMap::new(),
            overflow_warned: AtomicBool::new(false),
        })
    }

    pub fn params(&self) -> StatParams {
        **self.params.load()
    }

    /// the global statistic of all inbound traffic
    pub fn inbound_node(&self) -> Arc<ResourceNode> {
        self.inbound.clone()
    }

    pub fn get_resource_node(
        &self,
        name: &str,
        traffic_type: TrafficType,
    ) -> Option<Arc<ResourceNode>> {
        let key = ResourceWrapper::new(name.into(), ResourceType::Common, traffic_type);
        self.nodes.get(&key).map(|n| n.value().clone())
    }

    pub fn get_or_create_resource_node(&self, res: &ResourceWrapper) -> Result<Arc<ResourceNode>> {
        if let Some(node) = self.nodes.get(res) {
            return Ok(node.value().clone());
        }
        let node = match self.nodes.entry(res.clone()) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                let node = Arc::new(ResourceNode::new(
                    res.name().clone(),
                    *res.resource_type(),
                    self.params(),
                )?);
                e.insert(node.clone());
                node
            }
        };
        if self.nodes.len() > DEFAULT_MAX_RESOURCE_AMOUNT
            && !self.overflow_warned.swap(true, Ordering::SeqCst)
        {
            logging::warn!(
                "[NodeRegistry] Resource amount exceeds the threshold {}",
                DEFAULT_MAX_RESOURCE_AMOUNT
            );
        }
        Ok(node)
    }

    pub fn get_or_create_origin_node(
        &self,
        node: &ResourceNode,
        origin: &str,
    ) -> Result<Arc<ResourceNode>> {
        node.get_or_create_origin_node(origin)
    }

    /// a snapshot of all resource nodes, the inbound node excluded
    pub fn all_nodes(&self) -> Vec<(ResourceWrapper, Arc<ResourceNode>)> {
        self.nodes
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuilds the windows of every node with the new parameters.
    /// Nodes stay registered, so callers holding them keep recording into the same node.
    pub fn reset_all(&self, params: StatParams) -> Result<()> {
        params.check()?;
        self.params.store(Arc::new(params));
        self.inbound.reset(params)?;
        for node in self.nodes.iter() {
            node.value().reset(params)?;
        }
        logging::info!("[NodeRegistry] All resource nodes reset with {:?}", params);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{MetricEvent, ReadStat, WriteStat};
    use std::thread;

    fn res(name: &str, traffic_type: TrafficType) -> ResourceWrapper {
        ResourceWrapper::new(name.into(), ResourceType::Web, traffic_type)
    }

    #[test]
    fn lookup_by_identity() {
        let registry = NodeRegistry::new(StatParams::default()).unwrap();
        assert!(registry.is_empty());
        let inbound = registry
            .get_or_create_resource_node(&res("abc", TrafficType::Inbound))
            .unwrap();
        let outbound = registry
            .get_or_create_resource_node(&res("abc", TrafficType::Outbound))
            .unwrap();
        assert!(!Arc::ptr_eq(&inbound, &outbound));
        assert_eq!(registry.len(), 2);
        assert_eq!(inbound.resource_type(), ResourceType::Web);

        let found = registry
            .get_resource_node("abc", TrafficType::Inbound)
            .unwrap();
        assert!(Arc::ptr_eq(&found, &inbound));
        assert!(registry
            .get_resource_node("def", TrafficType::Inbound)
            .is_none());
        assert_eq!(
            registry.inbound_node().res_name(),
            TOTAL_IN_BOUND_RESOURCE_NAME
        );
    }

    #[test]
    fn concurrent_creation_yields_one_node() {
        let registry = Arc::new(NodeRegistry::new(StatParams::default()).unwrap());
        let mut handles = Vec::new();
        for _ in 0..64 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                registry
                    .get_or_create_resource_node(&res("hot", TrafficType::Inbound))
                    .unwrap()
            }));
        }
        let nodes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for n in &nodes {
            assert!(Arc::ptr_eq(n, &nodes[0]));
        }
        assert_eq!(registry.all_nodes().len(), 1);
    }

    #[test]
    fn origin_nodes() {
        let registry = NodeRegistry::new(StatParams::default()).unwrap();
        let node = registry
            .get_or_create_resource_node(&res("abc", TrafficType::Inbound))
            .unwrap();
        let a = registry.get_or_create_origin_node(&node, "a").unwrap();
        let b = registry.get_or_create_origin_node(&node, "b").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(
            &a,
            &registry.get_or_create_origin_node(&node, "a").unwrap()
        ));
    }

    #[test]
    fn reset_all() {
        let registry = NodeRegistry::new(StatParams::default()).unwrap();
        let node = registry
            .get_or_create_resource_node(&res("abc", TrafficType::Inbound))
            .unwrap();
        node.add_count(MetricEvent::Pass, 5);
        registry.inbound_node().add_count(MetricEvent::Pass, 5);

        let invalid = StatParams {
            interval_ms: 3000,
            ..Default::default()
        };
        assert!(registry.reset_all(invalid).is_err());
        assert_eq!(node.sum(MetricEvent::Pass), 5);

        let params = StatParams {
            sample_count_total: 10,
            interval_ms_total: 10000,
            sample_count: 1,
            interval_ms: 1000,
        };
        registry.reset_all(params).unwrap();
        assert_eq!(registry.params(), params);
        assert_eq!(node.sum(MetricEvent::Pass), 0);
        assert_eq!(registry.inbound_node().sum(MetricEvent::Pass), 0);
        let same = registry
            .get_or_create_resource_node(&res("abc", TrafficType::Inbound))
            .unwrap();
        assert!(Arc::ptr_eq(&same, &node));
        assert_eq!(same.params(), params);
    }
}
