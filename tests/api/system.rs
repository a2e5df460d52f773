use super::sentinel;
use sentinel_guard::{
    base::{BlockType, TrafficType},
    config::ConfigEntity,
    system::{MetricType, Rule},
    system_metric::SystemMetricSource,
    utils::sleep_for_ms,
    Result, Sentinel,
};
use std::sync::Arc;

fn rule(metric_type: MetricType, threshold: f64) -> Arc<Rule> {
    Arc::new(Rule {
        metric_type,
        threshold,
        ..Default::default()
    })
}

struct OverloadedMachine;

impl SystemMetricSource for OverloadedMachine {
    fn load_average(&self) -> Result<f64> {
        Ok(10.0)
    }

    fn cpu_usage(&self) -> Result<f64> {
        Ok(0.3)
    }
}

#[test]
fn qps_checked_before_thread() {
    let sentinel = sentinel();
    sentinel
        .system_rule_manager()
        .load_rules(vec![
            rule(MetricType::Concurrency, 0.0),
            rule(MetricType::InboundQps, 1.0),
        ])
        .unwrap();

    let inbound = |sentinel: &Sentinel| {
        sentinel
            .entry("qps_before_thread")
            .with_traffic_type(TrafficType::Inbound)
            .build()
    };
    let held = inbound(&sentinel).unwrap();
    // both dimensions are violated now, qps is reported
    let block_err = inbound(&sentinel).unwrap_err();
    assert_eq!(
        block_err.block_type(),
        BlockType::SystemFlow(MetricType::InboundQps)
    );
    assert_eq!(block_err.cause(), "system:qps");
    assert!(block_err.triggered_rule().is_some());
    held.exit();

    let inbound_item = sentinel.inbound_metrics();
    assert_eq!(inbound_item.pass_total, 1);
    assert_eq!(inbound_item.block_total, 1);
}

#[test]
fn outbound_calls_unchecked() {
    let sentinel = sentinel();
    sentinel
        .system_rule_manager()
        .load_rules(vec![rule(MetricType::InboundQps, 0.0)])
        .unwrap();
    sentinel
        .entry("outbound_unchecked")
        .with_traffic_type(TrafficType::Outbound)
        .build()
        .unwrap()
        .exit();
    assert_eq!(sentinel.inbound_metrics().pass_total, 0);
}

#[test]
fn thread_limit() {
    let sentinel = sentinel();
    sentinel
        .system_rule_manager()
        .load_rules(vec![rule(MetricType::Concurrency, 0.0)])
        .unwrap();

    let held = sentinel
        .entry("thread_limit")
        .with_traffic_type(TrafficType::Inbound)
        .build()
        .unwrap();
    let block_err = sentinel
        .entry("thread_limit")
        .with_traffic_type(TrafficType::Inbound)
        .build()
        .unwrap_err();
    assert_eq!(block_err.cause(), "system:thread");
    assert_eq!(block_err.triggered_value_as::<f64>(), Some(&1.0));
    held.exit();
}

#[test]
fn load_with_bbr() {
    let mut entity = ConfigEntity::new();
    entity.config.use_cache_time = false;
    entity.config.stat.system.system_interval_ms = 10;
    let sentinel = Sentinel::new(entity)
        .unwrap()
        .with_metric_source(Arc::new(OverloadedMachine));
    sentinel.start().unwrap();
    sentinel
        .system_rule_manager()
        .load_rules(vec![rule(MetricType::Load, 1.0)])
        .unwrap();
    sleep_for_ms(50);
    assert_eq!(sentinel.system_status().current_load(), 10.0);

    let inbound = |sentinel: &Sentinel| {
        sentinel
            .entry("load_with_bbr")
            .with_traffic_type(TrafficType::Inbound)
            .build()
    };
    // no completed call yet, the estimated capacity stays at a single call
    let first = inbound(&sentinel).unwrap();
    let second = inbound(&sentinel).unwrap();
    let block_err = inbound(&sentinel).unwrap_err();
    assert_eq!(block_err.cause(), "system:load");
    assert_eq!(block_err.triggered_value_as::<f64>(), Some(&10.0));

    first.exit();
    second.exit();
    sentinel.shutdown();
}

#[test]
fn invalid_rules_rejected() {
    let sentinel = sentinel();
    sentinel
        .system_rule_manager()
        .load_rules(vec![rule(MetricType::AvgRt, 100.0)])
        .unwrap();
    assert!(sentinel
        .system_rule_manager()
        .load_rules(vec![rule(MetricType::CpuUsage, 2.0)])
        .is_err());
    let thresholds = sentinel.system_thresholds();
    assert_eq!(thresholds.threshold(MetricType::AvgRt), Some(100.0));
    assert_eq!(thresholds.threshold(MetricType::CpuUsage), None);
}
