//! Object bookkeeping and idle-time eviction policies

use crate::config::PoolConfiguration;
use std::time::{Duration, Instant};

/// Lifecycle state of a pooled object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PooledObjectState {
    /// In the idle set, available for borrowing
    Idle,

    /// Checked out by a borrower
    Allocated,

    /// Failed a factory check and is about to be destroyed
    Invalid,
}

/// Bookkeeping the pool keeps for every live object
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub(crate) id: usize,
    pub(crate) state: PooledObjectState,
    pub(crate) created_at: Instant,
    pub(crate) last_borrowed_at: Instant,
    pub(crate) last_returned_at: Instant,
    pub(crate) last_used_at: Instant,
    pub(crate) borrow_count: u64,
}

impl ObjectMetadata {
    pub(crate) fn new(id: usize) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: PooledObjectState::Idle,
            created_at: now,
            last_borrowed_at: now,
            last_returned_at: now,
            last_used_at: now,
            borrow_count: 0,
        }
    }

    pub(crate) fn allocate(&mut self) {
        let now = Instant::now();
        self.state = PooledObjectState::Allocated;
        self.last_borrowed_at = now;
        self.last_used_at = now;
        self.borrow_count += 1;
    }

    pub(crate) fn deallocate(&mut self) {
        let now = Instant::now();
        self.state = PooledObjectState::Idle;
        self.last_returned_at = now;
        self.last_used_at = now;
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = PooledObjectState::Invalid;
    }

    /// Pool-unique object id
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> PooledObjectState {
        self.state
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_borrowed_at(&self) -> Instant {
        self.last_borrowed_at
    }

    pub fn last_returned_at(&self) -> Instant {
        self.last_returned_at
    }

    /// Number of times the object has been handed to a borrower
    pub fn borrow_count(&self) -> u64 {
        self.borrow_count
    }

    /// Time since the object was last borrowed or returned
    pub fn idle_time(&self) -> Duration {
        self.last_used_at.elapsed()
    }
}

/// Eviction policy applied to idle objects during an eviction run
///
/// # Examples
///
/// ```
/// use commons_objectpool::{EvictionPolicy, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_min_evictable_idle_time(Some(Duration::from_secs(60)))
///     .with_soft_min_evictable_idle_time(Some(Duration::from_secs(10)));
///
/// assert!(matches!(EvictionPolicy::from_config(&config), EvictionPolicy::Combined { .. }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Idle objects are never evicted for age
    #[default]
    None,

    /// Evict once idle longer than the timeout
    IdleTimeout(Duration),

    /// Evict once idle longer than the timeout while more than `min_idle` objects are idle
    SoftIdleTimeout(Duration),

    /// Hard timeout or soft timeout, whichever applies first
    Combined {
        idle_timeout: Duration,
        soft_idle_timeout: Duration,
    },
}

impl EvictionPolicy {
    pub fn from_config(config: &PoolConfiguration) -> Self {
        match (
            config.min_evictable_idle_time,
            config.soft_min_evictable_idle_time,
        ) {
            (Some(idle_timeout), Some(soft_idle_timeout)) => EvictionPolicy::Combined {
                idle_timeout,
                soft_idle_timeout,
            },
            (Some(idle), None) => EvictionPolicy::IdleTimeout(idle),
            (None, Some(soft)) => EvictionPolicy::SoftIdleTimeout(soft),
            (None, None) => EvictionPolicy::None,
        }
    }

    /// Decide whether an idle object should be evicted.
    ///
    /// `idle_count` includes the object under test.
    pub fn should_evict(&self, meta: &ObjectMetadata, idle_count: usize, min_idle: usize) -> bool {
        let idle = meta.idle_time();
        match *self {
            EvictionPolicy::None => false,
            EvictionPolicy::IdleTimeout(timeout) => idle > timeout,
            EvictionPolicy::SoftIdleTimeout(timeout) => idle > timeout && idle_count > min_idle,
            EvictionPolicy::Combined {
                idle_timeout,
                soft_idle_timeout,
            } => idle > idle_timeout || (idle > soft_idle_timeout && idle_count > min_idle),
        }
    }
}
