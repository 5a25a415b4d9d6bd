#![allow(dead_code)]

use commons_objectpool::{FactoryResult, ObjectFactory};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct Connection {
    pub serial: usize,
    pub activations: usize,
}

/// Call counters and failure switches shared between a test and its factory
#[derive(Default)]
pub struct FactoryStats {
    pub made: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub activated: AtomicUsize,
    pub passivated: AtomicUsize,
    pub validated: AtomicUsize,
    pub fail_make: AtomicBool,
    pub fail_activate: AtomicBool,
    pub fail_passivate: AtomicBool,
    pub panic_on_activate: AtomicBool,
    pub panic_on_passivate: AtomicBool,
    pub invalid: Mutex<HashSet<usize>>,
    pub panic_on_validate: Mutex<HashSet<usize>>,
}

impl FactoryStats {
    pub fn made(&self) -> usize {
        self.made.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn mark_invalid(&self, serial: usize) {
        self.invalid.lock().insert(serial);
    }
}

pub struct TrackingFactory {
    stats: Arc<FactoryStats>,
}

impl TrackingFactory {
    pub fn new() -> (Self, Arc<FactoryStats>) {
        let stats = Arc::new(FactoryStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

impl ObjectFactory<Connection> for TrackingFactory {
    fn make(&self) -> FactoryResult<Connection> {
        if self.stats.fail_make.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }
        let serial = self.stats.made.fetch_add(1, Ordering::SeqCst);
        Ok(Connection {
            serial,
            activations: 0,
        })
    }

    fn destroy(&self, _conn: Connection) -> FactoryResult<()> {
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> bool {
        self.stats.validated.fetch_add(1, Ordering::SeqCst);
        if self.stats.panic_on_validate.lock().contains(&conn.serial) {
            panic!("validate exploded for connection {}", conn.serial);
        }
        !self.stats.invalid.lock().contains(&conn.serial)
    }

    fn activate(&self, conn: &mut Connection) -> FactoryResult<()> {
        if self.stats.panic_on_activate.load(Ordering::SeqCst) {
            panic!("activate exploded for connection {}", conn.serial);
        }
        if self.stats.fail_activate.load(Ordering::SeqCst) {
            return Err("activation refused".into());
        }
        conn.activations += 1;
        self.stats.activated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn passivate(&self, conn: &mut Connection) -> FactoryResult<()> {
        if self.stats.panic_on_passivate.load(Ordering::SeqCst) {
            panic!("passivate exploded for connection {}", conn.serial);
        }
        if self.stats.fail_passivate.load(Ordering::SeqCst) {
            return Err("reset failed".into());
        }
        self.stats.passivated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
