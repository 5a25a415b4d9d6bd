//! Health monitoring for object pools

/// Health status of an object pool
///
/// # Examples
///
/// ```
/// use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let pool = GenericObjectPool::new(FnFactory::new(|| Ok(0u8)), PoolConfiguration::default()).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_objects, 0);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Active objects over `max_total` (0.0 to 1.0)
    pub utilization: f64,

    pub idle_objects: usize,

    pub active_objects: usize,

    /// Threads currently blocked in a borrow
    pub waiters: usize,

    /// Configured `max_total`
    pub max_total: usize,

    pub closed: bool,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    pub(crate) fn new(idle: usize, active: usize, waiters: usize, max_total: usize, closed: bool) -> Self {
        let utilization = if max_total > 0 {
            active as f64 / max_total as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = !closed;

        if closed {
            warnings.push("Pool is closed".to_string());
        }

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if waiters > 0 {
            warnings.push(format!("{} borrower(s) waiting for an object", waiters));
            is_healthy = false;
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            idle_objects: idle,
            active_objects: active,
            waiters,
            max_total,
            closed,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
