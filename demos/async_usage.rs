//! Async usage examples

use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== commons_objectpool - Async Examples ===\n");

    // Example 1: Async borrow
    async_borrow().await;

    // Example 2: Async borrow with timeout
    async_with_timeout().await;

    // Example 3: Concurrent access
    concurrent_access().await;
}

fn number_pool(config: PoolConfiguration) -> GenericObjectPool<u64> {
    GenericObjectPool::new(FnFactory::new(|| Ok(42)), config).unwrap()
}

async fn async_borrow() {
    println!("1. Async Borrow:");
    let pool = number_pool(PoolConfiguration::default());

    {
        let obj = pool.borrow_object_async().await.unwrap();
        println!("   Got object asynchronously: {}", *obj);
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");

    let config = PoolConfiguration::new()
        .with_max_total(1)
        .with_max_idle(1)
        .with_max_wait(Duration::from_millis(100));

    let pool = number_pool(config);

    let _obj = pool.borrow_object().unwrap();

    match pool.borrow_object_async().await {
        Ok(_) => println!("   Got object"),
        Err(e) => println!("   Error: {}", e),
    }

    println!();
}

async fn concurrent_access() {
    println!("3. Concurrent Access:");

    let config = PoolConfiguration::new()
        .with_max_total(3)
        .with_max_idle(3)
        .with_max_wait(Duration::from_secs(1));
    let pool = Arc::new(number_pool(config));

    let mut handles = vec![];

    for i in 0..10 {
        let pool_clone = Arc::clone(&pool);
        let handle = tokio::spawn(async move {
            match pool_clone.borrow_object_async().await {
                Ok(obj) => {
                    println!("   Task {} got object #{}", i, obj.id());
                    sleep(Duration::from_millis(20)).await;
                }
                Err(e) => println!("   Task {} couldn't get object: {}", i, e),
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let metrics = pool.get_metrics();
    println!("   Created: {}, Borrowed: {}", metrics.total_created, metrics.total_borrowed);
}
