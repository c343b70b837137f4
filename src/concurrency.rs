//! Per-node locking for concurrent tree operations
//!
//! Every inode owns one reader/writer lock. An operation collects the guards it
//! takes in a [`LockSet`], which releases them all (newest first) at the single
//! point where the operation returns, whatever the outcome.
//!
//! Multi-node acquisitions that do not follow a root-to-leaf path use
//! [`LockSet::try_acquire`] in ascending id order, and on contention drop
//! everything and wait with [`Backoff`].

use crate::config::BackoffConfig;
use crate::store::{NodeSlot, NodeStore};
use crate::types::NodeId;
use parking_lot::{Condvar, Mutex, RwLockReadGuard, RwLockWriteGuard};
use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Lock mode for a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

enum NodeGuard<'a> {
    Read(RwLockReadGuard<'a, NodeSlot>),
    Write(RwLockWriteGuard<'a, NodeSlot>),
}

impl NodeGuard<'_> {
    fn mode(&self) -> LockMode {
        match self {
            NodeGuard::Read(_) => LockMode::Read,
            NodeGuard::Write(_) => LockMode::Write,
        }
    }
}

/// Ordered list of the node locks held by one operation.
pub struct LockSet<'a> {
    store: &'a NodeStore,
    held: Vec<(NodeId, NodeGuard<'a>)>,
}

impl<'a> LockSet<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self {
            store,
            held: Vec::new(),
        }
    }

    /// Block until `id` is locked in `mode`.
    ///
    /// A node must not be locked twice by the same operation; parking_lot
    /// locks are not reentrant.
    pub fn acquire(&mut self, id: NodeId, mode: LockMode) {
        debug_assert!(self.mode_of(id).is_none(), "node {} locked twice", id);
        let store = self.store;
        let lock = store.slot_lock(id);
        let guard = match mode {
            LockMode::Read => NodeGuard::Read(lock.read()),
            LockMode::Write => NodeGuard::Write(lock.write()),
        };
        trace!(node = %id, ?mode, "acquired");
        self.held.push((id, guard));
    }

    /// Lock `id` in `mode` without blocking. Returns false, holding nothing
    /// new, when the lock is unavailable.
    pub fn try_acquire(&mut self, id: NodeId, mode: LockMode) -> bool {
        debug_assert!(self.mode_of(id).is_none(), "node {} locked twice", id);
        let store = self.store;
        let lock = store.slot_lock(id);
        let guard = match mode {
            LockMode::Read => lock.try_read().map(NodeGuard::Read),
            LockMode::Write => lock.try_write().map(NodeGuard::Write),
        };
        match guard {
            Some(guard) => {
                trace!(node = %id, ?mode, "acquired");
                self.held.push((id, guard));
                true
            }
            None => false,
        }
    }

    /// Release one node. Returns whether it was held.
    pub fn release(&mut self, id: NodeId) -> bool {
        match self.held.iter().position(|(held, _)| *held == id) {
            Some(index) => {
                self.held.remove(index);
                true
            }
            None => false,
        }
    }

    /// Release every held lock, most recent first.
    pub fn release_all(&mut self) {
        while self.held.pop().is_some() {}
    }

    pub fn mode_of(&self, id: NodeId) -> Option<LockMode> {
        self.held
            .iter()
            .find(|(held, _)| *held == id)
            .map(|(_, guard)| guard.mode())
    }

    /// Slot contents of a node held in either mode.
    pub fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.held
            .iter()
            .find(|(held, _)| *held == id)
            .map(|(_, guard)| match guard {
                NodeGuard::Read(g) => &**g,
                NodeGuard::Write(g) => &**g,
            })
    }

    /// Mutable slot contents of a node held for writing.
    pub fn slot_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.held
            .iter_mut()
            .find(|(held, _)| *held == id)
            .and_then(|(_, guard)| match guard {
                NodeGuard::Read(_) => None,
                NodeGuard::Write(g) => Some(&mut **g),
            })
    }

    /// Held node ids in acquisition order.
    pub fn held(&self) -> Vec<NodeId> {
        self.held.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Wake-up channel for operations backing off after lock contention.
///
/// Contending operations bump the epoch when they release; a waiter that saw
/// an older epoch returns immediately instead of sleeping.
#[derive(Default)]
pub struct ReleaseSignal {
    epoch: Mutex<u64>,
    cond: Condvar,
}

impl ReleaseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    pub fn notify(&self) {
        *self.epoch.lock() += 1;
        self.cond.notify_all();
    }

    /// Wait up to `timeout` for a release newer than `seen`.
    pub fn wait_since(&self, seen: u64, timeout: Duration) {
        let mut epoch = self.epoch.lock();
        if *epoch != seen {
            return;
        }
        let _ = self.cond.wait_for(&mut epoch, timeout);
    }
}

/// Bounded randomized backoff for try-acquire loops.
///
/// The first few retries only yield the thread. After that each retry waits
/// on the [`ReleaseSignal`] for a random delay drawn from an exponentially
/// growing window capped at `max_delay_us`.
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Upper bound of the wait window for the current attempt.
    pub fn window(&self) -> Duration {
        let waits = self.attempt.saturating_sub(self.config.spin_retries);
        let shift = waits.min(16);
        let micros = self
            .config
            .base_delay_us
            .saturating_mul(1u64 << shift)
            .min(self.config.max_delay_us);
        Duration::from_micros(micros)
    }

    pub fn snooze(&mut self, signal: &ReleaseSignal, seen: u64) {
        self.attempt += 1;
        if self.attempt <= self.config.spin_retries {
            std::thread::yield_now();
            return;
        }
        let window = self.window().as_micros() as u64;
        let delay = rand::thread_rng().gen_range(0..=window);
        trace!(attempt = self.attempt, delay_us = delay, "backing off");
        signal.wait_since(seen, Duration::from_micros(delay));
    }
}
