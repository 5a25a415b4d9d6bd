//! # commons_objectpool
//!
//! Bounded, thread-safe generic object pool. Objects are produced and
//! recycled through a pluggable [`ObjectFactory`]; the pool handles
//! borrowing, returning, blocking on exhaustion and background eviction.
//!
//! ## Features
//!
//! - Factory lifecycle hooks: make, destroy, validate, activate, passivate
//! - `min_idle` / `max_idle` / `max_total` sizing
//! - LIFO or FIFO reuse of idle objects
//! - Blocking borrow with an optional deadline, or fail-fast exhaustion
//! - Background evictor with idle-time eviction and idle validation
//! - Automatic return of objects via RAII (Drop trait)
//! - Async borrow for tokio callers
//! - Metrics, Prometheus export and health snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
//!
//! let pool = GenericObjectPool::new(FnFactory::new(|| Ok(String::new())), PoolConfiguration::default()).unwrap();
//! {
//!     let mut obj = pool.borrow_object().unwrap();
//!     obj.push_str("in use");
//!     // Object automatically returned when `obj` goes out of scope
//! }
//! assert_eq!(pool.num_idle(), 1);
//! ```

mod config;
mod errors;
mod eviction;
mod factory;
mod health;
mod metrics;
mod pool;

pub use config::PoolConfiguration;
pub use errors::{PoolError, PoolResult};
pub use eviction::{EvictionPolicy, ObjectMetadata, PooledObjectState};
pub use factory::{FactoryError, FactoryResult, FnFactory, ObjectFactory};
pub use health::HealthStatus;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{GenericObjectPool, PooledObject};
