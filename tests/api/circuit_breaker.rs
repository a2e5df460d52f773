use super::sentinel;
use sentinel_guard::{
    base::{BlockType, ConcurrencyStat, MetricEvent, StatNode, TrafficType},
    circuitbreaker::{BreakerStrategy, Rule, State},
    trace_error,
    utils::sleep_for_ms,
    Error,
};
use std::sync::Arc;

fn slow_rule(resource: &str) -> Arc<Rule> {
    Arc::new(Rule {
        resource: resource.into(),
        strategy: BreakerStrategy::SlowRequestRatio,
        retry_timeout_ms: 3000,
        min_request_amount: 5,
        stat_interval_ms: 10000,
        max_allowed_rt_ms: 20,
        threshold: 0.5,
        ..Default::default()
    })
}

fn error_count_rule(resource: &str) -> Arc<Rule> {
    Arc::new(Rule {
        resource: resource.into(),
        strategy: BreakerStrategy::ErrorCount,
        retry_timeout_ms: 100,
        min_request_amount: 1,
        stat_interval_ms: 10000,
        threshold: 2.0,
        ..Default::default()
    })
}

#[test]
fn slow_requests_trip() {
    let sentinel = sentinel();
    sentinel
        .circuit_breaker_manager()
        .load_rules(vec![slow_rule("slow_requests_trip")]);

    for slow in [true, false, true, false, true] {
        let entry = sentinel.entry("slow_requests_trip").build().unwrap();
        sleep_for_ms(if slow { 40 } else { 0 });
        entry.exit();
    }

    let block_err = sentinel.entry("slow_requests_trip").build().unwrap_err();
    assert_eq!(block_err.block_type(), BlockType::CircuitBreaking);
    assert_eq!(block_err.cause(), "degrade");
    assert!(block_err.triggered_rule().is_some());
    let snapshot = *block_err.triggered_value_as::<f64>().unwrap();
    assert!((snapshot - 0.6).abs() < 1e-9);

    let states = sentinel.breaker_states("slow_requests_trip");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].state, State::Open);
}

#[test]
fn slow_ratio_at_threshold_keeps_closed() {
    let sentinel = sentinel();
    sentinel
        .circuit_breaker_manager()
        .load_rules(vec![slow_rule("slow_ratio_at_threshold")]);

    for slow in [false, true, false, true, false, true] {
        let entry = sentinel.entry("slow_ratio_at_threshold").build().unwrap();
        sleep_for_ms(if slow { 40 } else { 0 });
        entry.exit();
    }
    assert_eq!(
        sentinel.breaker_states("slow_ratio_at_threshold")[0].state,
        State::Closed
    );
    sentinel
        .entry("slow_ratio_at_threshold")
        .build()
        .unwrap()
        .exit();
}

#[test]
fn single_probe_and_recovery() {
    let sentinel = sentinel();
    sentinel
        .circuit_breaker_manager()
        .load_rules(vec![error_count_rule("single_probe")]);

    for _ in 0..3 {
        let mut entry = sentinel.entry("single_probe").build().unwrap();
        trace_error(&mut entry, Error::msg("biz error"));
        entry.exit();
    }
    let states = sentinel.breaker_states("single_probe");
    assert_eq!(states[0].state, State::Open);
    assert_eq!(states[0].trip_snapshot, 3.0);
    assert!(sentinel.entry("single_probe").build().is_err());

    sleep_for_ms(150);
    let probe = sentinel.entry("single_probe").build().unwrap();
    assert_eq!(
        sentinel.breaker_states("single_probe")[0].state,
        State::HalfOpen
    );
    // only one call probes at a time
    assert!(sentinel.entry("single_probe").build().is_err());

    probe.exit();
    assert_eq!(
        sentinel.breaker_states("single_probe")[0].state,
        State::Closed
    );
    sentinel.entry("single_probe").build().unwrap().exit();
}

#[test]
fn failed_probe_reopens() {
    let sentinel = sentinel();
    sentinel
        .circuit_breaker_manager()
        .load_rules(vec![error_count_rule("failed_probe")]);

    for _ in 0..3 {
        let mut entry = sentinel.entry("failed_probe").build().unwrap();
        trace_error(&mut entry, Error::msg("biz error"));
        entry.exit();
    }
    sleep_for_ms(150);
    let mut probe = sentinel.entry("failed_probe").build().unwrap();
    trace_error(&mut probe, Error::msg("still failing"));
    probe.exit();

    assert_eq!(
        sentinel.breaker_states("failed_probe")[0].state,
        State::Open
    );
    assert!(sentinel.entry("failed_probe").build().is_err());
}

#[test]
fn rules_replaced() {
    let sentinel = sentinel();
    let manager = sentinel.circuit_breaker_manager();
    manager.load_rules(vec![error_count_rule("rules_replaced")]);
    for _ in 0..3 {
        let mut entry = sentinel.entry("rules_replaced").build().unwrap();
        trace_error(&mut entry, Error::msg("biz error"));
        entry.exit();
    }
    assert!(sentinel.entry("rules_replaced").build().is_err());

    manager.clear_rules();
    assert!(sentinel.breaker_states("rules_replaced").is_empty());
    sentinel.entry("rules_replaced").build().unwrap().exit();
}

#[test]
fn panicking_calls_count_as_errors() {
    let sentinel = sentinel();
    sentinel
        .circuit_breaker_manager()
        .load_rules(vec![error_count_rule("panicking_calls")]);

    for _ in 0..3 {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _entry = sentinel.entry("panicking_calls").build().unwrap();
            panic!("guarded code failed");
        }));
        assert!(result.is_err());
    }

    let node = sentinel
        .node_registry()
        .get_resource_node("panicking_calls", TrafficType::Outbound)
        .unwrap();
    assert_eq!(node.total(MetricEvent::Complete), 3);
    assert_eq!(node.total(MetricEvent::Error), 3);
    assert_eq!(node.current_concurrency(), 0);
    assert_eq!(
        sentinel.breaker_states("panicking_calls")[0].state,
        State::Open
    );
}
