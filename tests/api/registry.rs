use super::sentinel;
use rand::Rng;
use sentinel_guard::{
    base::{BlockType, ConcurrencyStat, MetricEvent, ReadStat, StatNode, TrafficType},
    stat::BucketLeapArray,
    utils::curr_time_millis,
};
use std::sync::Arc;

#[test]
fn concurrent_creation_yields_one_node() {
    let sentinel = Arc::new(sentinel());
    let handlers: Vec<_> = (0..32)
        .map(|_| {
            let sentinel = Arc::clone(&sentinel);
            std::thread::spawn(move || {
                sentinel
                    .entry("concurrent_creation")
                    .with_traffic_type(TrafficType::Inbound)
                    .build()
                    .unwrap()
                    .exit()
            })
        })
        .collect();
    for h in handlers {
        h.join().unwrap();
    }

    assert_eq!(sentinel.node_registry().len(), 1);
    let node = sentinel
        .node_registry()
        .get_resource_node("concurrent_creation", TrafficType::Inbound)
        .unwrap();
    assert_eq!(node.total(MetricEvent::Pass), 32);
    assert_eq!(node.total(MetricEvent::Complete), 32);
    assert_eq!(node.current_concurrency(), 0);
    assert_eq!(sentinel.inbound_metrics().pass_total, 32);
}

#[test]
fn origin_nodes() {
    let sentinel = sentinel();
    for origin in ["app-a", "app-b", "app-a"] {
        sentinel
            .entry("origin_nodes")
            .with_origin(origin.into())
            .build()
            .unwrap()
            .exit();
    }
    let node = sentinel
        .node_registry()
        .get_resource_node("origin_nodes", TrafficType::Outbound)
        .unwrap();
    assert_eq!(node.total(MetricEvent::Pass), 3);
    assert_eq!(
        node.get_origin_node("app-a")
            .unwrap()
            .total(MetricEvent::Pass),
        2
    );
    assert_eq!(node.origin_nodes().len(), 2);
    assert!(node.get_origin_node("app-c").is_none());
}

#[test]
fn authority_refuses_origin() {
    let sentinel = sentinel();
    sentinel
        .authority_slot()
        .set_checker(Some(Box::new(|_res: &str, origin: &str| origin != "intruder")));

    sentinel
        .entry("authority")
        .with_origin("friend".into())
        .build()
        .unwrap()
        .exit();
    let block_err = sentinel
        .entry("authority")
        .with_origin("intruder".into())
        .build()
        .unwrap_err();
    assert_eq!(block_err.block_type(), BlockType::Authority);
    assert_eq!(block_err.block_msg(), "origin intruder is not allowed");
    // calls without an origin are not checked
    sentinel.entry("authority").build().unwrap().exit();

    let item = &sentinel.resource_metrics("authority")[0];
    assert_eq!(item.pass_total, 2);
    assert_eq!(item.block_total, 1);
}

#[test]
fn directions_are_separate() {
    let sentinel = sentinel();
    sentinel.entry("directions").build().unwrap().exit();
    sentinel
        .entry("directions")
        .with_traffic_type(TrafficType::Inbound)
        .build()
        .unwrap()
        .exit();
    let metrics = sentinel.resource_metrics("directions");
    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|item| item.pass_total == 1));
    assert_eq!(sentinel.all_resource_metrics().len(), 2);
}

#[test]
fn window_writers_not_double_counted() {
    let array = Arc::new(BucketLeapArray::new(20, 10000).unwrap());
    let now = curr_time_millis();
    let handlers: Vec<_> = (0..8)
        .map(|_| {
            let array = Arc::clone(&array);
            std::thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let mut written = 0;
                for _ in 0..1000 {
                    let count = rng.gen_range(1..5);
                    // spread over the buckets of the window
                    array.add_count_with_time(now + rng.gen_range(0..5000), MetricEvent::Pass, count);
                    written += count;
                }
                written
            })
        })
        .collect();
    let written: u64 = handlers.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(array.count_with_time(now + 5000, MetricEvent::Pass), written);
}

#[test]
fn reset_statistics() {
    let sentinel = sentinel();
    sentinel.entry("reset").build().unwrap().exit();
    let mut params = sentinel.node_registry().params();
    params.sample_count = 1;
    sentinel.reset_statistics(params).unwrap();
    let item = &sentinel.resource_metrics("reset")[0];
    assert_eq!(item.pass_total, 0);
    assert_eq!(sentinel.node_registry().params(), params);
    assert_eq!(
        sentinel
            .node_registry()
            .inbound_node()
            .qps(MetricEvent::Pass),
        0.0
    );
}
