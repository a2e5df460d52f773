use super::{BucketLeapArray, SlidingWindowMetric};
use crate::{
    base::{
        check_validity_for_reuse_statistic, ConcurrencyStat, MetricEvent, ReadStat, ResourceType, StatNode, WriteStat, DEFAULT_INTERVAL_MS, DEFAULT_INTERVAL_MS_TOTAL,
        DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_COUNT_TOTAL, DEFAULT_STATISTIC_MAX_RT,
    },
    Result,
};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use enum_map::EnumMap;
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

/// Window parameters of the resource level statistic.
/// `sample_count_total`/`interval_ms_total` size the underlying bucket array,
/// `sample_count`/`interval_ms` size the read-only view used for QPS and RT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatParams {
    pub sample_count_total: u32,
    pub interval_ms_total: u32,
    pub sample_count: u32,
    pub interval_ms: u32,
}

impl Default for StatParams {
    fn default() -> Self {
        StatParams {
            sample_count_total: DEFAULT_SAMPLE_COUNT_TOTAL,
            interval_ms_total: DEFAULT_INTERVAL_MS_TOTAL,
            sample_count: DEFAULT_SAMPLE_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl StatParams {
    pub fn check(&self) -> Result<()> {
        check_validity_for_reuse_statistic(
            self.sample_count,
            self.interval_ms,
            self.sample_count_total,
            self.interval_ms_total,
        )
    }
}

#[derive(Debug)]
struct Windows {
    params: StatParams,
    arr: Arc<BucketLeapArray>,
    metric: Arc<SlidingWindowMetric>,
}

impl Windows {
    fn new(params: StatParams) -> Result<Self> {
        let arr = Arc::new(BucketLeapArray::new(
            params.sample_count_total,
            params.interval_ms_total,
        )?);
        let metric = Arc::new(SlidingWindowMetric::new(
            params.sample_count,
            params.interval_ms,
            arr.clone(),
        )?);
        Ok(Windows {
            params,
            arr,
            metric,
        })
    }
}

/// ResourceNode is the aggregate statistic of one resource, or of one caller origin
/// under a resource. It is shared by all concurrent calls and only mutated through atomics,
/// a reset swaps in fresh windows instead of rewriting the live ones.
#[derive(Debug)]
pub struct ResourceNode {
    res_name: String,
    resource_type: ResourceType,
    windows: ArcSwap<Windows>,
    totals: EnumMap<MetricEvent, AtomicU64>,
    concurrency: AtomicU32,
    // f64 bits, non-negative floats order the same way as their bits
    max_success_qps: AtomicU64,
    min_rt: AtomicU64,
    origins: DashMap<String, Arc<ResourceNode>>,
}

impl ResourceNode {
    pub fn new(res_name: String, resource_type: ResourceType, params: StatParams) -> Result<Self> {
        Ok(ResourceNode {
            res_name,
            resource_type,
            windows: ArcSwap::from_pointee(Windows::new(params)?),
            totals: EnumMap::default(),
            concurrency: AtomicU32::new(0),
            max_success_qps: AtomicU64::new(0f64.to_bits()),
            min_rt: AtomicU64::new(DEFAULT_STATISTIC_MAX_RT),
            origins: DashMap::new(),
        })
    }

    pub fn res_name(&self) -> &str {
        &self.res_name
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn params(&self) -> StatParams {
        self.windows.load().params
    }

    pub fn default_metric(&self) -> Arc<dyn ReadStat> {
        self.windows.load().metric.clone()
    }

    /// the highest per-second rate of the event within a single bucket of the default view
    pub fn max_avg(&self, event: MetricEvent) -> f64 {
        let windows = self.windows.load();
        let params = windows.params;
        windows.metric.max_of_single_bucket(event) as f64 * params.sample_count as f64
            / params.interval_ms as f64
            * 1000f64
    }

    pub fn max_concurrency(&self) -> u32 {
        self.windows.load().metric.max_concurrency()
    }

    pub fn min_rt_watermark(&self) -> u64 {
        self.min_rt.load(Ordering::SeqCst)
    }

    pub fn get_origin_node(&self, origin: &str) -> Option<Arc<ResourceNode>> {
        self.origins.get(origin).map(|n| n.value().clone())
    }

    /// Returns the sub-node of the caller origin, creating it on first use.
    /// Concurrent first calls for one origin all get the same node.
    pub fn get_or_create_origin_node(&self, origin: &str) -> Result<Arc<ResourceNode>> {
        if let Some(node) = self.get_origin_node(origin) {
            return Ok(node);
        }
        let node = match self.origins.entry(origin.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(e) => e.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let node = Arc::new(ResourceNode::new(
                    self.res_name.clone(),
                    self.resource_type,
                    self.params(),
                )?);
                e.insert(node.clone());
                node
            }
        };
        Ok(node)
    }

    pub fn origin_nodes(&self) -> Vec<(String, Arc<ResourceNode>)> {
        self.origins
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Drops the windowed statistic, the totals and the watermarks of the node
    /// and of its origin sub-nodes. The in-flight concurrency is kept.
    pub fn reset(&self, params: StatParams) -> Result<()> {
        let windows = Windows::new(params)?;
        self.windows.store(Arc::new(windows));
        for (_, total) in &self.totals {
            total.store(0, Ordering::SeqCst);
        }
        self.max_success_qps.store(0f64.to_bits(), Ordering::SeqCst);
        self.min_rt.store(DEFAULT_STATISTIC_MAX_RT, Ordering::SeqCst);
        for origin in self.origins.iter() {
            origin.value().reset(params)?;
        }
        Ok(())
    }
}

impl ReadStat for ResourceNode {
    fn qps(&self, event: MetricEvent) -> f64 {
        self.windows.load().metric.qps(event)
    }
    fn qps_previous(&self, event: MetricEvent) -> f64 {
        self.windows.load().metric.qps_previous(event)
    }
    fn sum(&self, event: MetricEvent) -> u64 {
        self.windows.load().metric.sum(event)
    }
    fn min_rt(&self) -> f64 {
        self.windows.load().metric.min_rt()
    }
    fn avg_rt(&self) -> f64 {
        self.windows.load().metric.avg_rt()
    }
}

impl WriteStat for ResourceNode {
    fn add_count(&self, event: MetricEvent, count: u64) {
        self.windows.load().arr.add_count(event, count);
        self.totals[event].fetch_add(count, Ordering::SeqCst);
        match event {
            MetricEvent::Complete => {
                let qps = self.max_avg(MetricEvent::Complete);
                self.max_success_qps
                    .fetch_max(qps.to_bits(), Ordering::SeqCst);
            }
            MetricEvent::Rt => {
                self.min_rt.fetch_min(count, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

impl ConcurrencyStat for ResourceNode {
    fn current_concurrency(&self) -> u32 {
        self.concurrency.load(Ordering::SeqCst)
    }

    fn increase_concurrency(&self) {
        let curr = self.concurrency.fetch_add(1, Ordering::SeqCst) + 1;
        self.windows.load().arr.update_concurrency(curr);
    }

    fn decrease_concurrency(&self) {
        // saturating, a reset between entry and exit must not wrap the gauge
        let _ = self
            .concurrency
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));
    }
}

impl StatNode for ResourceNode {
    fn generate_read_stat(&self, sample_count: u32, interval_ms: u32) -> Result<Arc<dyn ReadStat>> {
        let arr = self.windows.load().arr.clone();
        let stat = SlidingWindowMetric::new(sample_count, interval_ms, arr)?;
        Ok(Arc::new(stat))
    }

    fn total(&self, event: MetricEvent) -> u64 {
        self.totals[event].load(Ordering::SeqCst)
    }

    fn max_success_qps(&self) -> f64 {
        f64::from_bits(self.max_success_qps.load(Ordering::SeqCst))
    }

    fn min_observed_rt(&self) -> f64 {
        self.min_rt_watermark() as f64
    }
}
