//! Pooling simulated connections behind a lifecycle-aware factory

use commons_objectpool::{FactoryResult, GenericObjectPool, ObjectFactory, PoolConfiguration};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Connection {
    id: usize,
}

impl Connection {
    fn connect(&self) {
        info!(id = self.id, "Connection established");
    }

    fn disconnect(&self) {
        info!(id = self.id, "Connection closed");
    }
}

#[derive(Default)]
struct ConnectionFactory {
    next_id: std::sync::atomic::AtomicUsize,
}

impl ObjectFactory<Connection> for ConnectionFactory {
    fn make(&self) -> FactoryResult<Connection> {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(Connection { id })
    }

    // Called on every idle connection during eviction runs; returning false
    // drops it and the evictor creates a replacement to keep min_idle.
    fn validate(&self, _conn: &Connection) -> bool {
        true
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_target(false)
        .init();

    let config = PoolConfiguration::new()
        .with_min_idle(5)
        .with_max_total(20)
        .with_max_idle(10)
        .with_test_while_idle(true)
        .with_eviction_interval(Duration::from_secs(3 * 60));

    let pool = GenericObjectPool::new(ConnectionFactory::default(), config).unwrap();

    let conn = pool.borrow_object().unwrap();
    conn.connect();

    info!(active = pool.num_active(), idle = pool.num_idle(), "Pool state");

    conn.disconnect();
    pool.return_object(conn).unwrap();

    // Run the sweep now instead of waiting three minutes
    pool.evict().unwrap();
    info!(active = pool.num_active(), idle = pool.num_idle(), "After eviction run");

    pool.close();
}
