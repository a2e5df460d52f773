use super::sentinel;
use sentinel_guard::{
    base::{BlockType, TrafficType},
    flow,
    utils::sleep_for_ms,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[test]
fn direct_reject() {
    let sentinel = sentinel();
    assert!(sentinel.flow_rule_manager().load_rules(vec![Arc::new(flow::Rule {
        resource: "direct_reject".into(),
        threshold: 10.0,
        ..Default::default()
    })]));

    let mut passed = 0;
    for _ in 0..20 {
        match sentinel
            .entry("direct_reject")
            .with_traffic_type(TrafficType::Inbound)
            .build()
        {
            Ok(entry) => {
                passed += 1;
                entry.exit()
            }
            Err(block_err) => {
                assert_eq!(block_err.block_type(), BlockType::Flow);
                assert_eq!(block_err.cause(), "flow");
            }
        }
    }
    assert_eq!(passed, 10);

    let metrics = sentinel.resource_metrics("direct_reject");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].pass_total, 10);
    assert_eq!(metrics[0].block_total, 10);
}

#[test]
fn concurrency_limit() {
    let sentinel = sentinel();
    sentinel.flow_rule_manager().load_rules(vec![Arc::new(flow::Rule {
        resource: "concurrency_limit".into(),
        metric_type: flow::MetricType::Concurrency,
        threshold: 2.0,
        ..Default::default()
    })]);

    let first = sentinel.entry("concurrency_limit").build().unwrap();
    let second = sentinel.entry("concurrency_limit").build().unwrap();
    let block_err = sentinel.entry("concurrency_limit").build().unwrap_err();
    assert_eq!(block_err.triggered_value_as::<f64>(), Some(&2.0));

    first.exit();
    let third = sentinel.entry("concurrency_limit").build().unwrap();
    second.exit();
    third.exit();
    assert_eq!(sentinel.resource_metrics("concurrency_limit")[0].concurrency, 0);
}

#[test]
fn concurrent_callers() {
    let sentinel = Arc::new(sentinel());
    sentinel.flow_rule_manager().load_rules(vec![Arc::new(flow::Rule {
        resource: "concurrent_callers".into(),
        metric_type: flow::MetricType::Concurrency,
        threshold: 4.0,
        ..Default::default()
    })]);
    let passed = Arc::new(AtomicU64::new(0));
    let blocked = Arc::new(AtomicU64::new(0));

    let handlers: Vec<_> = (0..16)
        .map(|_| {
            let sentinel = Arc::clone(&sentinel);
            let passed = Arc::clone(&passed);
            let blocked = Arc::clone(&blocked);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    match sentinel.entry("concurrent_callers").build() {
                        Ok(entry) => {
                            passed.fetch_add(1, Ordering::SeqCst);
                            sleep_for_ms(rand::random::<u64>() % 3);
                            entry.exit()
                        }
                        Err(_) => {
                            blocked.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();
    for h in handlers {
        h.join().unwrap();
    }

    let item = &sentinel.resource_metrics("concurrent_callers")[0];
    assert_eq!(item.pass_total, passed.load(Ordering::SeqCst));
    assert_eq!(item.block_total, blocked.load(Ordering::SeqCst));
    assert_eq!(item.pass_total + item.block_total, 16 * 20);
    assert_eq!(item.concurrency, 0);
}

#[test]
fn rules_from_yaml() {
    let sentinel = sentinel();
    let yaml = r#"
- resource: yaml_rules
  metric_type: Qps
  threshold: 1.0
"#;
    assert!(sentinel
        .flow_rule_manager()
        .load_rules_from_yaml(yaml)
        .unwrap());
    sentinel.entry("yaml_rules").build().unwrap().exit();
    assert!(sentinel.entry("yaml_rules").build().is_err());
}
