//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let pool = GenericObjectPool::new(FnFactory::new(|| Ok(1u8)), PoolConfiguration::default()).unwrap();
///
/// {
///     let _obj = pool.borrow_object().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_created, 1);
///     assert_eq!(metrics.total_borrowed, 1);
///     assert_eq!(metrics.active_objects, 1);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Objects produced by the factory
    pub total_created: usize,

    /// Objects handed to the factory for destruction
    pub total_destroyed: usize,

    /// Objects destroyed by the eviction sweep
    pub total_evicted: usize,

    /// Successful borrows
    pub total_borrowed: usize,

    /// Objects returned to the idle set
    pub total_returned: usize,

    /// Failed activations, validations and passivations
    pub validation_failures: usize,

    /// Borrows that found the pool at `max_total`
    pub exhausted_events: usize,

    /// Borrows that gave up waiting
    pub borrow_timeouts: usize,

    /// Completed eviction sweeps
    pub eviction_runs: usize,

    /// Current active objects
    pub active_objects: usize,

    /// Current idle objects
    pub idle_objects: usize,

    /// Active objects over `max_total` (0.0 to 1.0)
    pub utilization: f64,

    /// Configured `max_total`
    pub max_total: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_destroyed".to_string(), self.total_destroyed.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert("total_borrowed".to_string(), self.total_borrowed.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("borrow_timeouts".to_string(), self.borrow_timeouts.to_string());
        metrics.insert("eviction_runs".to_string(), self.eviction_runs.to_string());
        metrics.insert("active_objects".to_string(), self.active_objects.to_string());
        metrics.insert("idle_objects".to_string(), self.idle_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_total".to_string(), self.max_total.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool = GenericObjectPool::new(FnFactory::new(|| Ok(1u8)), PoolConfiguration::default()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("objectpool_objects_active"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let labels = Self::format_labels(pool_name, tags);
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(labels.clone());
        let registry = Registry::new();

        let gauges = [
            ("objectpool_objects_active", "Current active objects", metrics.active_objects),
            ("objectpool_objects_idle", "Current idle objects", metrics.idle_objects),
            ("objectpool_max_total", "Configured object limit", metrics.max_total),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(opts(name, help))?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let utilization = Gauge::with_opts(opts("objectpool_utilization", "Pool utilization ratio"))?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        let counters = [
            ("objectpool_objects_created_total", "Objects created", metrics.total_created),
            ("objectpool_objects_destroyed_total", "Objects destroyed", metrics.total_destroyed),
            ("objectpool_objects_evicted_total", "Objects evicted", metrics.total_evicted),
            ("objectpool_objects_borrowed_total", "Objects borrowed", metrics.total_borrowed),
            ("objectpool_objects_returned_total", "Objects returned", metrics.total_returned),
            ("objectpool_validation_failures_total", "Validation failures", metrics.validation_failures),
            ("objectpool_events_exhausted_total", "Pool exhausted events", metrics.exhausted_events),
            ("objectpool_borrow_timeouts_total", "Borrow timeouts", metrics.borrow_timeouts),
            ("objectpool_eviction_runs_total", "Eviction runs", metrics.eviction_runs),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(opts(name, help))?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }

        labels
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub evicted: AtomicUsize,
    pub borrowed: AtomicUsize,
    pub returned: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub exhausted_events: AtomicUsize,
    pub borrow_timeouts: AtomicUsize,
    pub eviction_runs: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, active: usize, idle: usize, max_total: usize) -> PoolMetrics {
        let utilization = if max_total > 0 {
            active as f64 / max_total as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_created: self.created.load(Ordering::Relaxed),
            total_destroyed: self.destroyed.load(Ordering::Relaxed),
            total_evicted: self.evicted.load(Ordering::Relaxed),
            total_borrowed: self.borrowed.load(Ordering::Relaxed),
            total_returned: self.returned.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            borrow_timeouts: self.borrow_timeouts.load(Ordering::Relaxed),
            eviction_runs: self.eviction_runs.load(Ordering::Relaxed),
            active_objects: active,
            idle_objects: idle,
            utilization,
            max_total,
        }
    }
}
