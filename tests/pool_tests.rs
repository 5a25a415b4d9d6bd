mod common;

use common::{Connection, TrackingFactory};
use commons_objectpool::{GenericObjectPool, PoolConfiguration, PoolError, PooledObjectState};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn pool_with(config: PoolConfiguration) -> (GenericObjectPool<Connection>, Arc<common::FactoryStats>) {
    let (factory, stats) = TrackingFactory::new();
    (GenericObjectPool::new(factory, config).unwrap(), stats)
}

#[test]
fn test_empty_borrow_makes_exactly_once() {
    let (pool, stats) = pool_with(PoolConfiguration::default());

    let conn = pool.borrow_object().unwrap();

    assert_eq!(stats.made(), 1);
    assert_eq!(conn.activations, 1);
    assert_eq!(conn.metadata().state(), PooledObjectState::Allocated);
    assert_eq!(pool.num_active(), 1);
    assert_eq!(pool.num_idle(), 0);
}

#[test]
fn test_return_moves_object_to_idle() {
    let (pool, stats) = pool_with(PoolConfiguration::default());

    let conn = pool.borrow_object().unwrap();
    pool.return_object(conn).unwrap();

    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.num_idle(), 1);
    assert_eq!(stats.passivated.load(Ordering::SeqCst), 1);

    // Reuse does not call make again
    let again = pool.borrow_object().unwrap();
    assert_eq!(again.serial, 0);
    assert_eq!(again.metadata().borrow_count(), 2);
    assert_eq!(stats.made(), 1);
}

#[test]
fn test_failed_passivation_destroys_object() {
    let (pool, stats) = pool_with(PoolConfiguration::default());

    let conn = pool.borrow_object().unwrap();
    stats.fail_passivate.store(true, Ordering::SeqCst);
    pool.return_object(conn).unwrap();

    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.num_idle(), 0);
    assert_eq!(stats.destroyed(), 1);
}

#[test]
fn test_max_idle_surplus_is_destroyed_on_return() {
    let (pool, stats) = pool_with(PoolConfiguration::new().with_max_idle(2).with_max_total(5));

    let borrowed: Vec<_> = (0..3).map(|_| pool.borrow_object().unwrap()).collect();
    let mut borrowed = borrowed.into_iter();

    pool.return_object(borrowed.next().unwrap()).unwrap();
    pool.return_object(borrowed.next().unwrap()).unwrap();
    assert_eq!(stats.destroyed(), 0);

    pool.return_object(borrowed.next().unwrap()).unwrap();
    assert_eq!(stats.destroyed(), 1);
    assert_eq!(pool.num_idle(), 2);

    // The oldest idle object (serial 0) was the one dropped
    let next = pool.borrow_object().unwrap();
    assert_eq!(next.serial, 2);
}

#[test]
fn test_total_never_exceeds_max_under_contention() {
    let (pool, _stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(4)
            .with_max_idle(4)
            .with_max_wait(Duration::from_secs(5)),
    );
    let pool = Arc::new(pool);
    let done = Arc::new(AtomicBool::new(false));

    let observer = {
        let pool = Arc::clone(&pool);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let health = pool.get_health_status();
                assert!(health.active_objects + health.idle_objects <= 4);
                thread::yield_now();
            }
        })
    };

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut conn = pool.borrow_object().unwrap();
                    conn.activations += 1;
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    observer.join().unwrap();

    let metrics = pool.get_metrics();
    assert_eq!(metrics.total_borrowed, 1600);
    assert!(metrics.total_created <= 4);
    assert_eq!(pool.num_active(), 0);
}

#[test]
fn test_blocking_borrow_times_out() {
    let (pool, _stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_max_wait(Duration::from_millis(100)),
    );

    let _held = pool.borrow_object().unwrap();
    let started = Instant::now();
    let err = pool.borrow_object().unwrap_err();

    assert_eq!(err, PoolError::Timeout(Duration::from_millis(100)));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(pool.get_metrics().borrow_timeouts, 1);
}

#[test]
fn test_blocking_borrow_succeeds_after_return() {
    let (pool, stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_max_wait(Duration::from_millis(100)),
    );
    let pool = Arc::new(pool);

    let held = pool.borrow_object().unwrap();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.borrow_object().map(|conn| conn.serial))
    };

    thread::sleep(Duration::from_millis(20));
    pool.return_object(held).unwrap();

    assert_eq!(waiter.join().unwrap(), Ok(0));
    assert_eq!(stats.made(), 1);
}

#[test]
fn test_per_call_timeout_overrides_config() {
    let (pool, _stats) = pool_with(PoolConfiguration::new().with_max_total(1).with_max_idle(1));

    let _held = pool.borrow_object().unwrap();
    let err = pool
        .borrow_object_with_timeout(Duration::from_millis(30))
        .unwrap_err();

    assert_eq!(err, PoolError::Timeout(Duration::from_millis(30)));
}

#[test]
fn test_close_wakes_blocked_borrowers() {
    let (pool, _stats) = pool_with(PoolConfiguration::new().with_max_total(1).with_max_idle(1));
    let pool = Arc::new(pool);

    let held = pool.borrow_object().unwrap();
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.borrow_object().map(|_| ()))
        })
        .collect();

    while pool.num_waiters() < 3 {
        thread::sleep(Duration::from_millis(5));
    }
    pool.close();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Err(PoolError::PoolClosed));
    }
    assert_eq!(pool.borrow_object().unwrap_err(), PoolError::PoolClosed);
    drop(held);
}

#[test]
fn test_close_destroys_idle_and_late_returns() {
    let (pool, stats) = pool_with(PoolConfiguration::default());

    let a = pool.borrow_object().unwrap();
    let b = pool.borrow_object().unwrap();
    pool.return_object(a).unwrap();

    pool.close();
    assert!(pool.is_closed());
    assert_eq!(stats.destroyed(), 1);
    assert_eq!(pool.num_idle(), 0);

    pool.return_object(b).unwrap();
    assert_eq!(stats.destroyed(), 2);
    assert_eq!(pool.num_active(), 0);
}

#[test]
fn test_make_failure_is_propagated_without_leaking_capacity() {
    let (pool, stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_block_when_exhausted(false),
    );

    stats.fail_make.store(true, Ordering::SeqCst);
    let err = pool.borrow_object().unwrap_err();
    assert!(matches!(err, PoolError::FactoryCreateFailed(ref msg) if msg == "connection refused"));
    assert_eq!(pool.num_active(), 0);

    stats.fail_make.store(false, Ordering::SeqCst);
    assert!(pool.borrow_object().is_ok());
}

#[test]
fn test_panicking_activation_releases_capacity() {
    let (pool, stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_block_when_exhausted(false),
    );

    pool.add_object().unwrap();
    stats.panic_on_activate.store(true, Ordering::SeqCst);

    // First the idle object, then a freshly created one
    for destroyed in 1..=2 {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pool.borrow_object()));
        assert!(outcome.is_err());
        assert_eq!(pool.num_active(), 0);
        assert_eq!(pool.num_idle(), 0);
        assert_eq!(stats.destroyed(), destroyed);
    }

    stats.panic_on_activate.store(false, Ordering::SeqCst);
    let conn = pool.borrow_object().unwrap();
    assert_eq!(conn.serial, 2);

    let metrics = pool.get_metrics();
    assert_eq!(metrics.total_created - metrics.total_destroyed, 1);
}

#[test]
fn test_panicking_passivation_on_return_releases_capacity() {
    let (pool, stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_block_when_exhausted(false),
    );

    let conn = pool.borrow_object().unwrap();
    stats.panic_on_passivate.store(true, Ordering::SeqCst);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pool.return_object(conn)));
    assert!(outcome.is_err());

    assert_eq!(pool.num_active(), 0);
    assert_eq!(stats.destroyed(), 1);

    stats.panic_on_passivate.store(false, Ordering::SeqCst);
    assert_eq!(pool.borrow_object().unwrap().serial, 1);
}

#[test]
fn test_try_borrow_reports_create_failure_as_none() {
    let (pool, stats) = pool_with(PoolConfiguration::new().with_max_total(1).with_max_idle(1));

    stats.fail_make.store(true, Ordering::SeqCst);
    assert!(pool.try_borrow_object().is_none());
    assert_eq!(pool.num_active(), 0);

    stats.fail_make.store(false, Ordering::SeqCst);
    let conn = pool.try_borrow_object().unwrap();
    assert!(pool.try_borrow_object().is_none());
    assert_eq!(conn.serial, 0);
}

#[test]
fn test_failed_activation_of_idle_object_falls_through_to_create() {
    let (pool, stats) = pool_with(PoolConfiguration::default());

    pool.add_object().unwrap();
    pool.add_object().unwrap();
    assert_eq!(pool.num_idle(), 2);

    stats.fail_activate.store(true, Ordering::SeqCst);
    assert_eq!(pool.borrow_object().unwrap_err(), PoolError::ValidationFailed);

    // Both idle objects and the fresh one were destroyed
    assert_eq!(stats.destroyed(), 3);
    assert_eq!(pool.num_idle(), 0);
    assert_eq!(pool.num_active(), 0);
}

#[test]
fn test_borrow_validation_skips_invalid_idle_object() {
    let (pool, stats) = pool_with(PoolConfiguration::new().with_test_on_borrow(true));

    pool.add_object().unwrap();
    stats.mark_invalid(0);

    let conn = pool.borrow_object().unwrap();
    assert_eq!(conn.serial, 1);
    assert_eq!(stats.destroyed(), 1);
    assert_eq!(pool.get_metrics().validation_failures, 1);
}

#[test]
fn test_return_validation_destroys_invalid_object() {
    let (pool, stats) = pool_with(PoolConfiguration::new().with_test_on_return(true));

    let conn = pool.borrow_object().unwrap();
    stats.mark_invalid(conn.serial);
    pool.return_object(conn).unwrap();

    assert_eq!(pool.num_idle(), 0);
    assert_eq!(stats.destroyed(), 1);
}

#[test]
fn test_invalidate_frees_capacity() {
    let (pool, stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_block_when_exhausted(false),
    );

    let conn = pool.borrow_object().unwrap();
    pool.invalidate_object(conn).unwrap();

    assert_eq!(stats.destroyed(), 1);
    assert_eq!(pool.borrow_object().unwrap().serial, 1);
}

#[test]
fn test_prepare_pool_and_clear() {
    let (pool, stats) = pool_with(PoolConfiguration::new().with_min_idle(3).with_max_idle(5));

    pool.prepare_pool().unwrap();
    assert_eq!(pool.num_idle(), 3);

    pool.prepare_pool().unwrap();
    assert_eq!(stats.made(), 3);

    pool.clear();
    assert_eq!(pool.num_idle(), 0);
    assert_eq!(stats.destroyed(), 3);
}

#[test]
fn test_add_object_respects_max_total() {
    let (pool, _stats) = pool_with(PoolConfiguration::new().with_max_total(2).with_max_idle(2));

    assert_eq!(pool.add_object(), Ok(true));
    assert_eq!(pool.add_object(), Ok(true));
    assert_eq!(pool.add_object(), Ok(false));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let (factory, _stats) = TrackingFactory::new();
    let result = GenericObjectPool::new(factory, PoolConfiguration::new().with_min_idle(9));

    assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
}

#[test]
fn test_health_reports_exhaustion() {
    let (pool, _stats) = pool_with(PoolConfiguration::new().with_max_total(1).with_max_idle(1));

    let _held = pool.borrow_object().unwrap();
    let health = pool.get_health_status();

    assert!(!health.is_healthy());
    assert_eq!(health.utilization, 1.0);
}

#[tokio::test]
async fn test_async_borrow_times_out() {
    let (pool, _stats) = pool_with(
        PoolConfiguration::new()
            .with_max_total(1)
            .with_max_idle(1)
            .with_max_wait(Duration::from_millis(50)),
    );

    let _held = pool.borrow_object_async().await.unwrap();
    let err = pool.borrow_object_async().await.unwrap_err();

    assert_eq!(err, PoolError::Timeout(Duration::from_millis(50)));
}
