//! Core object pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::{EvictionPolicy, ObjectMetadata};
use crate::factory::ObjectFactory;
use crate::health::HealthStatus;
#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;
use crate::metrics::{MetricsTracker, PoolMetrics};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// A value together with the bookkeeping the pool keeps for it
struct PoolEntry<T> {
    value: T,
    meta: ObjectMetadata,
}

/// An object borrowed from a [`GenericObjectPool`].
///
/// Dereferences to the pooled value. Dropping the handle returns the object
/// to the pool it came from, which is equivalent to calling
/// [`GenericObjectPool::return_object`] and ignoring the result.
pub struct PooledObject<T> {
    value: Option<T>,
    meta: ObjectMetadata,
    pool: Arc<PoolInner<T>>,
}

impl<T> PooledObject<T> {
    /// Pool-unique id of the borrowed object
    pub fn id(&self) -> usize {
        self.meta.id()
    }

    /// Lifecycle bookkeeping of the borrowed object
    pub fn metadata(&self) -> &ObjectMetadata {
        &self.meta
    }

    fn take_entry(&mut self) -> Option<PoolEntry<T>> {
        self.value.take().map(|value| PoolEntry {
            value,
            meta: self.meta.clone(),
        })
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.take_entry() {
            let id = entry.meta.id();
            if let Err(e) = self.pool.return_entry(entry) {
                warn!(object_id = id, error = %e, "Failed to return object to pool");
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("id", &self.meta.id())
            .field("value", &self.value)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Creating,
    UnderTest,
    Active(usize),
}

/// Idle and active partitions plus the objects in transit between them
struct PoolState<T> {
    /// Most recently returned first
    idle: VecDeque<PoolEntry<T>>,
    active: HashSet<usize>,
    creating: usize,
    under_test: usize,
    waiters: usize,
    closed: bool,
}

impl<T> PoolState<T> {
    fn total(&self) -> usize {
        self.idle.len() + self.active.len() + self.creating + self.under_test
    }

    fn hold(&mut self, slot: Slot) {
        match slot {
            Slot::Creating => self.creating += 1,
            Slot::UnderTest => self.under_test += 1,
            Slot::Active(id) => {
                self.active.insert(id);
            }
        }
    }

    fn release(&mut self, slot: Slot) {
        match slot {
            Slot::Creating => self.creating -= 1,
            Slot::UnderTest => self.under_test -= 1,
            Slot::Active(id) => {
                self.active.remove(&id);
            }
        }
    }
}

/// Capacity reserved for an object the factory has not made yet.
///
/// Dropping an unreleased guard gives the capacity back and wakes a waiter,
/// so a failing or panicking `make` cannot leak it.
struct SlotGuard<'a, T> {
    inner: &'a PoolInner<T>,
    slot: Slot,
    armed: bool,
}

impl<'a, T> SlotGuard<'a, T> {
    fn reserve(inner: &'a PoolInner<T>, state: &mut PoolState<T>, slot: Slot) -> Self {
        state.hold(slot);
        Self {
            inner,
            slot,
            armed: true,
        }
    }

    /// Hand the capacity over to the caller, who holds the lock
    fn release(mut self, state: &mut PoolState<T>) {
        state.release(self.slot);
        self.armed = false;
    }

    /// Move the reserved capacity onto the object that was made for it
    fn attach(mut self, entry: PoolEntry<T>) -> Claimed<'a, T> {
        self.armed = false;
        Claimed::adopt(self.inner, self.slot, entry)
    }
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().release(self.slot);
            self.inner.available.notify_one();
        }
    }
}

/// An object out of the idle set while factory hooks run on it without the lock.
///
/// The object keeps its slot until the claim is released or disarmed.
/// Dropping the claim, whether after a failed hook or while unwinding from a
/// panicking one, gives the slot back, wakes a waiter and destroys the object.
struct Claimed<'a, T> {
    inner: &'a PoolInner<T>,
    slot: Slot,
    entry: Option<PoolEntry<T>>,
}

impl<'a, T> Claimed<'a, T> {
    fn take(
        inner: &'a PoolInner<T>,
        state: &mut PoolState<T>,
        slot: Slot,
        entry: PoolEntry<T>,
    ) -> Self {
        state.hold(slot);
        Self::adopt(inner, slot, entry)
    }

    /// Claim an object whose slot is already held
    fn adopt(inner: &'a PoolInner<T>, slot: Slot, entry: PoolEntry<T>) -> Self {
        Self {
            inner,
            slot,
            entry: Some(entry),
        }
    }

    /// Give the slot back under the caller's lock and hand over the object
    fn release(self, state: &mut PoolState<T>) -> PoolEntry<T> {
        state.release(self.slot);
        self.disarm()
    }

    /// Hand over the object together with its slot
    fn disarm(mut self) -> PoolEntry<T> {
        self.entry.take().expect("Claim already released")
    }
}

impl<T> Deref for Claimed<'_, T> {
    type Target = PoolEntry<T>;

    fn deref(&self) -> &Self::Target {
        self.entry.as_ref().expect("Claim already released")
    }
}

impl<T> DerefMut for Claimed<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.entry.as_mut().expect("Claim already released")
    }
}

impl<T> Drop for Claimed<'_, T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.inner.state.lock().release(self.slot);
            self.inner.available.notify_one();
            self.inner.destroy(entry);
        }
    }
}

struct PoolInner<T> {
    factory: Box<dyn ObjectFactory<T>>,
    config: PoolConfiguration,
    eviction_policy: EvictionPolicy,
    state: Mutex<PoolState<T>>,
    /// Signalled whenever an idle object or free capacity appears
    available: Condvar,
    metrics: MetricsTracker,
    next_id: AtomicUsize,
}

impl<T> PoolInner<T> {
    fn borrow(
        self: &Arc<Self>,
        block: bool,
        max_wait: Option<Duration>,
    ) -> PoolResult<PooledObject<T>> {
        let deadline = max_wait.and_then(|wait| Instant::now().checked_add(wait));
        let mut counted_exhausted = false;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(PoolError::PoolClosed);
            }

            let next = if self.config.lifo {
                state.idle.pop_front()
            } else {
                state.idle.pop_back()
            };

            if let Some(entry) = next {
                let slot = Slot::Active(entry.meta.id());
                let mut claim = Claimed::take(self, &mut state, slot, entry);
                drop(state);

                match self.activate(&mut claim.value, self.config.test_on_borrow) {
                    Ok(()) => return Ok(self.allocate(claim.disarm())),
                    Err(reason) => {
                        warn!(object_id = claim.meta.id(), %reason, "Discarding idle object on borrow");
                        MetricsTracker::incr(&self.metrics.validation_failures);
                        claim.meta.invalidate();
                        drop(claim);
                    }
                }

                state = self.state.lock();
                continue;
            }

            if state.total() < self.config.max_total {
                let slot = SlotGuard::reserve(self, &mut state, Slot::Creating);
                drop(state);
                return self.create_for_borrow(slot);
            }

            if !counted_exhausted {
                MetricsTracker::incr(&self.metrics.exhausted_events);
                counted_exhausted = true;
            }
            if !block {
                return Err(PoolError::Exhausted);
            }

            state.waiters += 1;
            let timed_out = match deadline {
                Some(deadline) => self.available.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.available.wait(&mut state);
                    false
                }
            };
            state.waiters -= 1;

            if timed_out
                && !state.closed
                && state.idle.is_empty()
                && state.total() >= self.config.max_total
            {
                MetricsTracker::incr(&self.metrics.borrow_timeouts);
                let waited = max_wait.unwrap_or_default();
                debug!(?waited, "Borrow timed out on exhausted pool");
                return Err(PoolError::Timeout(waited));
            }
        }
    }

    fn create_for_borrow(self: &Arc<Self>, slot: SlotGuard<'_, T>) -> PoolResult<PooledObject<T>> {
        let entry = self.make_object()?;

        let mut claim = {
            let mut state = self.state.lock();
            slot.release(&mut state);
            if state.closed {
                drop(state);
                self.destroy(entry);
                return Err(PoolError::PoolClosed);
            }
            let slot = Slot::Active(entry.meta.id());
            Claimed::take(self, &mut state, slot, entry)
        };

        let validate = self.config.test_on_create || self.config.test_on_borrow;
        if let Err(reason) = self.activate(&mut claim.value, validate) {
            warn!(object_id = claim.meta.id(), %reason, "Discarding newly created object");
            MetricsTracker::incr(&self.metrics.validation_failures);
            claim.meta.invalidate();
            return Err(PoolError::ValidationFailed);
        }

        Ok(self.allocate(claim.disarm()))
    }

    fn make_object(&self) -> PoolResult<PoolEntry<T>> {
        match self.factory.make() {
            Ok(value) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                MetricsTracker::incr(&self.metrics.created);
                debug!(object_id = id, "Created pooled object");
                Ok(PoolEntry {
                    value,
                    meta: ObjectMetadata::new(id),
                })
            }
            Err(e) => {
                warn!(error = %e, "Factory failed to create object");
                Err(PoolError::FactoryCreateFailed(e.to_string()))
            }
        }
    }

    fn activate(&self, value: &mut T, validate: bool) -> Result<(), String> {
        self.factory
            .activate(value)
            .map_err(|e| format!("activation failed: {e}"))?;
        if validate && !self.factory.validate(value) {
            return Err("validation failed".to_string());
        }
        Ok(())
    }

    fn allocate(self: &Arc<Self>, mut entry: PoolEntry<T>) -> PooledObject<T> {
        entry.meta.allocate();
        MetricsTracker::incr(&self.metrics.borrowed);
        PooledObject {
            value: Some(entry.value),
            meta: entry.meta,
            pool: Arc::clone(self),
        }
    }

    fn return_entry(&self, entry: PoolEntry<T>) -> PoolResult<()> {
        let id = entry.meta.id();
        let mut claim = Claimed::adopt(self, Slot::Active(id), entry);

        if self.config.test_on_return && !self.factory.validate(&claim.value) {
            warn!(object_id = id, "Returned object failed validation");
            MetricsTracker::incr(&self.metrics.validation_failures);
            claim.meta.invalidate();
            return self.discard_owned(claim.disarm());
        }

        if let Err(e) = self.factory.passivate(&mut claim.value) {
            warn!(object_id = id, error = %e, "Passivation failed, destroying object");
            MetricsTracker::incr(&self.metrics.validation_failures);
            claim.meta.invalidate();
            return self.discard_owned(claim.disarm());
        }

        let surplus = {
            let mut state = self.state.lock();
            let mut entry = claim.disarm();
            if !state.active.remove(&id) {
                drop(state);
                self.destroy(entry);
                return Err(PoolError::NotOwnedByThisPool);
            }
            if state.closed {
                drop(state);
                self.destroy(entry);
                return Ok(());
            }

            entry.meta.deallocate();
            state.idle.push_front(entry);

            let mut surplus = Vec::new();
            while state.idle.len() > self.config.max_idle {
                if let Some(oldest) = state.idle.pop_back() {
                    surplus.push(oldest);
                }
            }
            surplus
        };

        MetricsTracker::incr(&self.metrics.returned);
        self.available.notify_one();

        for entry in surplus {
            debug!(object_id = entry.meta.id(), "Idle count above max_idle, destroying oldest");
            self.destroy(entry);
        }
        Ok(())
    }

    fn discard_owned(&self, entry: PoolEntry<T>) -> PoolResult<()> {
        if self.discard_active(entry) {
            Ok(())
        } else {
            Err(PoolError::NotOwnedByThisPool)
        }
    }

    /// Remove an allocated object from the active set and destroy it
    fn discard_active(&self, entry: PoolEntry<T>) -> bool {
        let owned = self.state.lock().active.remove(&entry.meta.id());
        self.available.notify_one();
        self.destroy(entry);
        owned
    }

    fn destroy(&self, entry: PoolEntry<T>) {
        let PoolEntry { value, meta } = entry;
        debug!(
            object_id = meta.id(),
            state = ?meta.state(),
            borrows = meta.borrow_count(),
            "Destroying pooled object"
        );
        if let Err(e) = self.factory.destroy(value) {
            warn!(object_id = meta.id(), error = %e, "Factory failed to destroy object");
        }
        MetricsTracker::incr(&self.metrics.destroyed);
    }

    /// Create one passivated idle object if capacity allows.
    ///
    /// With `only_below_min_idle` nothing is created once `min_idle` objects
    /// are idle or being created.
    fn add_idle(&self, only_below_min_idle: bool) -> PoolResult<bool> {
        let slot = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PoolError::PoolClosed);
            }
            if state.total() >= self.config.max_total {
                return Ok(false);
            }
            if only_below_min_idle && state.idle.len() + state.creating >= self.config.min_idle {
                return Ok(false);
            }
            SlotGuard::reserve(self, &mut state, Slot::Creating)
        };

        let mut claim = slot.attach(self.make_object()?);
        if let Err(reason) = self.prepare_idle(&mut claim.value) {
            warn!(object_id = claim.meta.id(), %reason, "Discarding newly created idle object");
            MetricsTracker::incr(&self.metrics.validation_failures);
            claim.meta.invalidate();
            return Err(PoolError::ValidationFailed);
        }

        let mut state = self.state.lock();
        let entry = claim.release(&mut state);
        if state.closed {
            drop(state);
            self.destroy(entry);
            return Err(PoolError::PoolClosed);
        }
        state.idle.push_front(entry);
        drop(state);

        self.available.notify_one();
        Ok(true)
    }

    fn prepare_idle(&self, value: &mut T) -> Result<(), String> {
        if self.config.test_on_create && !self.factory.validate(value) {
            return Err("validation failed".to_string());
        }
        self.factory
            .passivate(value)
            .map_err(|e| format!("passivation failed: {e}"))
    }

    fn ensure_min_idle(&self) -> PoolResult<()> {
        while self.add_idle(true)? {}
        Ok(())
    }

    /// One eviction sweep followed by a top-up to `min_idle`
    fn evict(&self) -> PoolResult<()> {
        let snapshot: Vec<usize> = {
            let state = self.state.lock();
            if state.closed {
                return Err(PoolError::PoolClosed);
            }
            state
                .idle
                .iter()
                .rev()
                .take(self.config.num_tests_per_eviction_run.unwrap_or(usize::MAX))
                .map(|entry| entry.meta.id())
                .collect()
        };

        for id in snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| self.evict_one(id))).is_err() {
                error!(object_id = id, "Panic while testing idle object, destroyed it");
            }
        }
        MetricsTracker::incr(&self.metrics.eviction_runs);

        match panic::catch_unwind(AssertUnwindSafe(|| self.ensure_min_idle())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(PoolError::PoolClosed)) => Err(PoolError::PoolClosed),
            Ok(Err(e)) => {
                warn!(error = %e, "Could not restore min_idle after eviction");
                Ok(())
            }
            Err(_) => {
                error!("Panic while restoring min_idle after eviction");
                Ok(())
            }
        }
    }

    fn evict_one(&self, id: usize) {
        let (mut claim, position, idle_count) = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            // Borrowed since the snapshot was taken
            let Some(position) = state.idle.iter().position(|entry| entry.meta.id() == id) else {
                return;
            };
            let idle_count = state.idle.len();
            let Some(entry) = state.idle.remove(position) else {
                return;
            };
            let claim = Claimed::take(self, &mut state, Slot::UnderTest, entry);
            (claim, position, idle_count)
        };

        let expired = self
            .eviction_policy
            .should_evict(&claim.meta, idle_count, self.config.min_idle);

        let failed_test = !expired
            && self.config.test_while_idle
            && match self.test_idle(&mut claim.value) {
                Ok(()) => false,
                Err(reason) => {
                    warn!(object_id = id, %reason, "Idle object failed validation");
                    MetricsTracker::incr(&self.metrics.validation_failures);
                    claim.meta.invalidate();
                    true
                }
            };

        if expired || failed_test {
            debug!(
                object_id = id,
                idle_ms = claim.meta.idle_time().as_millis() as u64,
                "Evicting idle object"
            );
            MetricsTracker::incr(&self.metrics.evicted);
            drop(claim);
            return;
        }

        let mut state = self.state.lock();
        let entry = claim.release(&mut state);
        if state.closed {
            drop(state);
            self.destroy(entry);
            return;
        }
        let position = position.min(state.idle.len());
        state.idle.insert(position, entry);
        drop(state);
        self.available.notify_one();
    }

    fn test_idle(&self, value: &mut T) -> Result<(), String> {
        self.activate(value, true)?;
        self.factory
            .passivate(value)
            .map_err(|e| format!("passivation failed: {e}"))
    }

    fn drain_idle(&self) -> Vec<PoolEntry<T>> {
        let drained: Vec<_> = self.state.lock().idle.drain(..).collect();
        self.available.notify_all();
        drained
    }

    fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
        }

        for entry in self.drain_idle() {
            self.destroy(entry);
        }
        true
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Background thread running eviction sweeps until shut down
struct Evictor {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Evictor {
    fn start<T: Send + 'static>(pool: Weak<PoolInner<T>>, interval: Duration) -> PoolResult<Self> {
        let (shutdown, signal) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name("objectpool-evictor".to_string())
            .spawn(move || Self::run(pool, interval, signal))
            .map_err(|e| PoolError::EvictorStartFailed(e.to_string()))?;
        Ok(Self { shutdown, handle })
    }

    fn run<T>(pool: Weak<PoolInner<T>>, interval: Duration, signal: Receiver<()>) {
        debug!(?interval, "Evictor started");
        loop {
            match signal.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let Some(inner) = pool.upgrade() else {
                break;
            };
            if inner.evict().is_err() {
                break;
            }
        }
        debug!("Evictor stopped");
    }

    fn stop(self) {
        let _ = self.shutdown.try_send(());
        if self.handle.join().is_err() {
            error!("Evictor thread panicked");
        }
    }
}

/// Bounded, thread-safe pool of objects produced by an [`ObjectFactory`].
///
/// # Examples
///
/// ```
/// use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let pool = GenericObjectPool::new(
///     FnFactory::new(|| Ok(Vec::<u8>::with_capacity(1024))),
///     PoolConfiguration::new().with_max_total(4),
/// )
/// .unwrap();
///
/// {
///     let mut buffer = pool.borrow_object().unwrap();
///     buffer.extend_from_slice(b"hello");
///     assert_eq!(pool.num_active(), 1);
/// }
///
/// assert_eq!(pool.num_active(), 0);
/// assert_eq!(pool.num_idle(), 1);
/// ```
pub struct GenericObjectPool<T: Send + 'static> {
    inner: Arc<PoolInner<T>>,
    evictor: Mutex<Option<Evictor>>,
}

impl<T: Send + 'static> GenericObjectPool<T> {
    /// Create a pool; starts the evictor thread when `eviction_interval` is set
    pub fn new<F>(factory: F, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: ObjectFactory<T> + 'static,
    {
        config.validate()?;

        debug!(
            min_idle = config.min_idle,
            max_idle = config.max_idle,
            max_total = config.max_total,
            "Created object pool"
        );

        let interval = config.eviction_interval;
        let inner = Arc::new(PoolInner {
            factory: Box::new(factory),
            eviction_policy: EvictionPolicy::from_config(&config),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.max_idle),
                active: HashSet::new(),
                creating: 0,
                under_test: 0,
                waiters: 0,
                closed: false,
            }),
            config,
            available: Condvar::new(),
            metrics: MetricsTracker::new(),
            next_id: AtomicUsize::new(0),
        });

        let evictor = interval
            .map(|interval| Evictor::start(Arc::downgrade(&inner), interval))
            .transpose()?;

        Ok(Self {
            inner,
            evictor: Mutex::new(evictor),
        })
    }

    /// Borrow an object, waiting up to `max_wait` if the pool is exhausted
    /// and `block_when_exhausted` is set
    pub fn borrow_object(&self) -> PoolResult<PooledObject<T>> {
        self.inner
            .borrow(self.inner.config.block_when_exhausted, self.inner.config.max_wait)
    }

    /// Borrow with a per-call wait limit instead of the configured `max_wait`
    pub fn borrow_object_with_timeout(&self, max_wait: Duration) -> PoolResult<PooledObject<T>> {
        self.inner
            .borrow(self.inner.config.block_when_exhausted, Some(max_wait))
    }

    /// Borrow without ever blocking.
    ///
    /// `None` covers every failure; anything other than plain exhaustion is
    /// logged.
    pub fn try_borrow_object(&self) -> Option<PooledObject<T>> {
        match self.inner.borrow(false, None) {
            Ok(obj) => Some(obj),
            Err(PoolError::Exhausted) => None,
            Err(e) => {
                warn!(error = %e, "Non-blocking borrow failed");
                None
            }
        }
    }

    /// Borrow on the blocking thread pool so async callers are not stalled
    pub async fn borrow_object_async(&self) -> PoolResult<PooledObject<T>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner.borrow(inner.config.block_when_exhausted, inner.config.max_wait)
        })
        .await
        .map_err(|_| PoolError::Cancelled)?
    }

    /// Return a borrowed object.
    ///
    /// Fails with [`PoolError::NotOwnedByThisPool`] if the object was borrowed
    /// from another pool; that object then goes back to its own pool.
    pub fn return_object(&self, mut obj: PooledObject<T>) -> PoolResult<()> {
        if !Arc::ptr_eq(&self.inner, &obj.pool) {
            return Err(PoolError::NotOwnedByThisPool);
        }
        match obj.take_entry() {
            Some(entry) => self.inner.return_entry(entry),
            None => Ok(()),
        }
    }

    /// Destroy a borrowed object instead of returning it
    pub fn invalidate_object(&self, mut obj: PooledObject<T>) -> PoolResult<()> {
        if !Arc::ptr_eq(&self.inner, &obj.pool) {
            return Err(PoolError::NotOwnedByThisPool);
        }
        match obj.take_entry() {
            Some(mut entry) => {
                debug!(object_id = entry.meta.id(), "Invalidating borrowed object");
                entry.meta.invalidate();
                self.inner.discard_owned(entry)
            }
            None => Ok(()),
        }
    }

    /// Create one idle object; returns `false` if the pool is at `max_total`
    pub fn add_object(&self) -> PoolResult<bool> {
        self.inner.add_idle(false)
    }

    /// Create idle objects until `min_idle` is reached
    pub fn prepare_pool(&self) -> PoolResult<()> {
        self.inner.ensure_min_idle()
    }

    /// Run one eviction sweep on the calling thread
    pub fn evict(&self) -> PoolResult<()> {
        self.inner.evict()
    }

    /// Destroy every idle object
    pub fn clear(&self) {
        for entry in self.inner.drain_idle() {
            self.inner.destroy(entry);
        }
    }

    /// Close the pool.
    ///
    /// Idle objects are destroyed and blocked borrowers fail with
    /// [`PoolError::PoolClosed`]. Objects still borrowed are destroyed when
    /// they are returned.
    pub fn close(&self) {
        if self.inner.close() {
            debug!("Closed object pool");
        }
        if let Some(evictor) = self.evictor.lock().take() {
            evictor.stop();
        }
    }

    /// Check whether the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Get active count
    pub fn num_active(&self) -> usize {
        self.inner.state.lock().active.len()
    }

    /// Get idle count
    pub fn num_idle(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Threads currently blocked waiting for an object
    pub fn num_waiters(&self) -> usize {
        self.inner.state.lock().waiters
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfiguration {
        &self.inner.config
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let (active, idle) = {
            let state = self.inner.state.lock();
            (state.active.len(), state.idle.len())
        };
        self.inner
            .metrics
            .get_metrics(active, idle, self.inner.config.max_total)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        let state = self.inner.state.lock();
        HealthStatus::new(
            state.idle.len(),
            state.active.len(),
            state.waiters,
            self.inner.config.max_total,
            state.closed,
        )
    }
}

impl<T: Send + 'static> Drop for GenericObjectPool<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Send + 'static> fmt::Debug for GenericObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("GenericObjectPool")
            .field("active", &state.active.len())
            .field("idle", &state.idle.len())
            .field("waiters", &state.waiters)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FnFactory;

    fn counter_pool(config: PoolConfiguration) -> GenericObjectPool<usize> {
        let next = AtomicUsize::new(0);
        GenericObjectPool::new(
            FnFactory::new(move || Ok(next.fetch_add(1, Ordering::Relaxed))),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_borrow_and_drop_returns_object() {
        let pool = counter_pool(PoolConfiguration::default());

        {
            let obj = pool.borrow_object().unwrap();
            assert_eq!(*obj, 0);
            assert_eq!(pool.num_active(), 1);
            assert_eq!(obj.metadata().borrow_count(), 1);
        }

        assert_eq!(pool.num_active(), 0);
        assert_eq!(pool.num_idle(), 1);
    }

    #[test]
    fn test_lifo_reuses_most_recent() {
        let pool = counter_pool(PoolConfiguration::default());

        let a = pool.borrow_object().unwrap();
        let b = pool.borrow_object().unwrap();
        pool.return_object(a).unwrap();
        pool.return_object(b).unwrap();

        assert_eq!(*pool.borrow_object().unwrap(), 1);
    }

    #[test]
    fn test_fifo_reuses_oldest() {
        let pool = counter_pool(PoolConfiguration::new().with_lifo(false));

        let a = pool.borrow_object().unwrap();
        let b = pool.borrow_object().unwrap();
        pool.return_object(a).unwrap();
        pool.return_object(b).unwrap();

        assert_eq!(*pool.borrow_object().unwrap(), 0);
    }

    #[test]
    fn test_return_to_foreign_pool_is_rejected() {
        let first = counter_pool(PoolConfiguration::default());
        let second = counter_pool(PoolConfiguration::default());

        let obj = first.borrow_object().unwrap();
        assert_eq!(second.return_object(obj), Err(PoolError::NotOwnedByThisPool));

        assert_eq!(first.num_idle(), 1);
        assert_eq!(second.num_idle(), 0);
    }

    #[test]
    fn test_non_blocking_exhaustion() {
        let pool = counter_pool(
            PoolConfiguration::new()
                .with_max_total(1)
                .with_max_idle(1)
                .with_block_when_exhausted(false),
        );

        let _held = pool.borrow_object().unwrap();
        assert_eq!(pool.borrow_object().unwrap_err(), PoolError::Exhausted);
        assert!(pool.try_borrow_object().is_none());
        assert_eq!(pool.get_metrics().exhausted_events, 2);
    }

    #[tokio::test]
    async fn test_async_borrow() {
        let pool = counter_pool(PoolConfiguration::default());

        {
            let obj = pool.borrow_object_async().await.unwrap();
            assert_eq!(*obj, 0);
        }

        assert_eq!(pool.num_idle(), 1);
    }
}
