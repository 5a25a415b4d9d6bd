//! Basic usage examples for GenericObjectPool

use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
use std::time::Duration;

fn main() {
    println!("=== commons_objectpool - Basic Examples ===\n");

    // Example 1: Simple pool of buffers
    simple_pool();

    // Example 2: Exhaustion behaviour
    exhaustion();

    // Example 3: Try methods
    try_methods();

    // Example 4: Metrics and health
    metrics_and_health();
}

fn buffer_pool(config: PoolConfiguration) -> GenericObjectPool<Vec<u8>> {
    GenericObjectPool::new(FnFactory::new(|| Ok(Vec::with_capacity(4096))), config).unwrap()
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = buffer_pool(PoolConfiguration::default());

    {
        let mut buf = pool.borrow_object().unwrap();
        buf.extend_from_slice(b"payload");
        println!("   Got buffer #{} holding {} bytes", buf.id(), buf.len());
        // Object automatically returned when dropped
    }

    println!("   Idle after return: {}\n", pool.num_idle());
}

fn exhaustion() {
    println!("2. Exhaustion:");

    let config = PoolConfiguration::new()
        .with_max_total(2)
        .with_max_idle(2)
        .with_max_wait(Duration::from_millis(50));

    let pool = buffer_pool(config);

    let _a = pool.borrow_object().unwrap();
    let _b = pool.borrow_object().unwrap();
    match pool.borrow_object() {
        Ok(_) => println!("   Unexpectedly got a third buffer"),
        Err(e) => println!("   Third borrow: {}", e),
    }

    println!();
}

fn try_methods() {
    println!("3. Try Methods:");
    let pool = buffer_pool(PoolConfiguration::new().with_max_total(1).with_max_idle(1));

    let first = pool.try_borrow_object();
    assert!(first.is_some());
    println!("   First try: Success");

    let second = pool.try_borrow_object();
    assert!(second.is_none());
    println!("   Second try: None (pool exhausted)");

    drop(first);

    let third = pool.try_borrow_object();
    assert!(third.is_some());
    println!("   Third try: Success\n");
}

fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = buffer_pool(PoolConfiguration::default());

    {
        let _a = pool.borrow_object().unwrap();
        let _b = pool.borrow_object().unwrap();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!("   Active: {}, Idle: {}", health.active_objects, health.idle_objects);
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }

    println!("\n{}", pool.export_metrics_prometheus("buffers", None).unwrap());
}
