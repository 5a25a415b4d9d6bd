//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use commons_objectpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_min_idle(5)
///     .with_max_idle(10)
///     .with_max_total(20)
///     .with_test_while_idle(true)
///     .with_eviction_interval(Duration::from_secs(180));
///
/// assert_eq!(config.max_total, 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Number of idle objects the evictor tries to keep available
    pub min_idle: usize,

    /// Idle objects beyond this count are destroyed on return
    pub max_idle: usize,

    /// Maximum number of objects (idle + active) the pool may hold
    pub max_total: usize,

    /// Borrow the most recently returned object first
    pub lifo: bool,

    /// Validate objects right after `make`
    pub test_on_create: bool,

    /// Validate idle objects before handing them out
    pub test_on_borrow: bool,

    /// Validate objects when they are returned
    pub test_on_return: bool,

    /// Validate idle objects during eviction runs
    pub test_while_idle: bool,

    /// Delay between eviction runs; `None` disables the evictor thread
    pub eviction_interval: Option<Duration>,

    /// Idle time after which an object is evicted unconditionally
    pub min_evictable_idle_time: Option<Duration>,

    /// Idle time after which an object is evicted if more than `min_idle` are idle
    pub soft_min_evictable_idle_time: Option<Duration>,

    /// Idle objects examined per eviction run; `None` examines all of them
    pub num_tests_per_eviction_run: Option<usize>,

    /// Wait for an object instead of failing when the pool is exhausted
    pub block_when_exhausted: bool,

    /// Upper bound on that wait; `None` waits until an object is available
    pub max_wait: Option<Duration>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            min_idle: 0,
            max_idle: 8,
            max_total: 8,
            lifo: true,
            test_on_create: false,
            test_on_borrow: false,
            test_on_return: false,
            test_while_idle: false,
            eviction_interval: None,
            min_evictable_idle_time: Some(Duration::from_secs(30 * 60)),
            soft_min_evictable_idle_time: None,
            num_tests_per_eviction_run: None,
            block_when_exhausted: true,
            max_wait: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the size and timing settings for consistency
    ///
    /// # Examples
    ///
    /// ```
    /// use commons_objectpool::{PoolConfiguration, PoolError};
    ///
    /// let config = PoolConfiguration::new().with_min_idle(10).with_max_idle(5);
    /// assert!(matches!(config.validate(), Err(PoolError::InvalidConfiguration(_))));
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_total == 0 {
            return Err(PoolError::InvalidConfiguration(
                "max_total must be greater than zero".to_string(),
            ));
        }
        if self.max_idle < self.min_idle {
            return Err(PoolError::InvalidConfiguration(format!(
                "max_idle ({}) must be at least min_idle ({})",
                self.max_idle, self.min_idle
            )));
        }
        if self.max_total < self.max_idle {
            return Err(PoolError::InvalidConfiguration(format!(
                "max_total ({}) must be at least max_idle ({})",
                self.max_total, self.max_idle
            )));
        }
        if self.eviction_interval == Some(Duration::ZERO) {
            return Err(PoolError::InvalidConfiguration(
                "eviction_interval must be non-zero".to_string(),
            ));
        }
        if self.num_tests_per_eviction_run == Some(0) {
            return Err(PoolError::InvalidConfiguration(
                "num_tests_per_eviction_run must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_min_idle(mut self, count: usize) -> Self {
        self.min_idle = count;
        self
    }

    pub fn with_max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    /// Set the maximum number of objects, idle and active combined
    pub fn with_max_total(mut self, count: usize) -> Self {
        self.max_total = count;
        self
    }

    pub fn with_lifo(mut self, lifo: bool) -> Self {
        self.lifo = lifo;
        self
    }

    pub fn with_test_on_create(mut self, enabled: bool) -> Self {
        self.test_on_create = enabled;
        self
    }

    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    pub fn with_test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    pub fn with_test_while_idle(mut self, enabled: bool) -> Self {
        self.test_while_idle = enabled;
        self
    }

    /// Run the background evictor at this interval
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    pub fn with_min_evictable_idle_time(mut self, idle: Option<Duration>) -> Self {
        self.min_evictable_idle_time = idle;
        self
    }

    pub fn with_soft_min_evictable_idle_time(mut self, idle: Option<Duration>) -> Self {
        self.soft_min_evictable_idle_time = idle;
        self
    }

    pub fn with_num_tests_per_eviction_run(mut self, count: usize) -> Self {
        self.num_tests_per_eviction_run = Some(count);
        self
    }

    pub fn with_block_when_exhausted(mut self, block: bool) -> Self {
        self.block_when_exhausted = block;
        self
    }

    /// Bound how long a borrow waits on an exhausted pool
    ///
    /// # Examples
    ///
    /// ```
    /// use commons_objectpool::PoolConfiguration;
    /// use std::time::Duration;
    ///
    /// let config = PoolConfiguration::new().with_max_wait(Duration::from_millis(100));
    ///
    /// assert!(config.block_when_exhausted);
    /// assert_eq!(config.max_wait, Some(Duration::from_millis(100)));
    /// ```
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = Some(wait);
        self
    }
}
