//! move
//!
//! The source parent, destination parent and moved node are not on one
//! root-to-leaf path, so they are write-locked in ascending id order with
//! non-blocking attempts. Any failed attempt drops every lock held and backs
//! off before starting over, so a mover never waits while holding a lock.
//!
//! Ids are resolved before locking and can go stale while the mover backs
//! off. Once the three write locks are held, each handle's generation is
//! checked and both parent paths are walked again from the root with
//! non-blocking read locks that stay held until the commit. A stale handle or
//! a path that no longer leads to the same node restarts the whole operation.

use super::{path, resolver};
use crate::concurrency::{Backoff, LockMode, LockSet, ReleaseSignal};
use crate::config::BackoffConfig;
use crate::error::{FsError, FsResult};
use crate::store::NodeStore;
use crate::types::{NodeHandle, NodeId, ROOT};
use tracing::debug;

/// Outcome of one locking round.
enum Attempt {
    Done(FsResult<()>),
    /// A lock was unavailable; back off and retry with the same handles.
    Contended,
    /// The tree changed since resolution; resolve again.
    Stale,
}

/// Outcome of re-walking a path under the move's locks.
enum Rewalk {
    Reached,
    Contended,
    Stale,
    /// The walk passed through the node being moved.
    ThroughChild,
}

struct Plan<'p> {
    src_name: &'p str,
    dst_name: &'p str,
    src_parent_path: &'p [&'p str],
    dst_parent_path: &'p [&'p str],
    child: NodeHandle,
    src_parent: NodeHandle,
    dst_parent: NodeHandle,
}

pub(super) fn move_node(
    store: &NodeStore,
    signal: &ReleaseSignal,
    backoff: BackoffConfig,
    src: &str,
    dst: &str,
) -> FsResult<()> {
    let src_components = path::components(src)?;
    let dst_components = path::components(dst)?;
    if src_components.is_empty() || src_components == dst_components {
        return Err(FsError::InvalidMove);
    }

    let mut backoff = Backoff::new(backoff);
    let mut restarts = 0u32;
    loop {
        let child = resolver::resolve_handle(store, &src_components)?;
        if resolver::resolve_handle(store, &dst_components).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let (src_parent_path, src_name) = path::split_parent_child(&src_components)?;
        let (dst_parent_path, dst_name) = match path::split_parent_child(&dst_components) {
            Ok(split) => split,
            // Only the root has no parent, and the root always exists.
            Err(_) => return Err(FsError::AlreadyExists),
        };
        if path::is_within(&src_components, dst_parent_path) {
            return Err(FsError::InvalidMove);
        }

        let plan = Plan {
            src_name,
            dst_name,
            src_parent_path,
            dst_parent_path,
            child,
            src_parent: resolver::resolve_handle(store, src_parent_path)?,
            dst_parent: resolver::resolve_handle(store, dst_parent_path)?,
        };

        loop {
            let seen = signal.epoch();
            let mut locks = LockSet::new(store);
            let outcome = attempt(store, &mut locks, &plan);
            let released = !locks.is_empty();
            drop(locks);
            if released {
                signal.notify();
            }

            match outcome {
                Attempt::Done(result) => {
                    debug!(
                        retries = backoff.attempts(),
                        restarts,
                        ok = result.is_ok(),
                        "move finished"
                    );
                    return result;
                }
                Attempt::Contended => backoff.snooze(signal, seen),
                Attempt::Stale => break,
            }
        }
        restarts += 1;
        debug!(restarts, "move preconditions changed, resolving again");
    }
}

fn attempt(store: &NodeStore, locks: &mut LockSet<'_>, plan: &Plan<'_>) -> Attempt {
    let mut order = vec![plan.src_parent.id, plan.dst_parent.id, plan.child.id];
    order.sort_unstable();
    order.dedup();
    for id in order {
        if !locks.try_acquire(id, LockMode::Write) {
            return Attempt::Contended;
        }
    }

    for handle in [plan.child, plan.src_parent, plan.dst_parent] {
        if !locks.slot(handle.id).is_some_and(|slot| slot.matches(handle)) {
            return Attempt::Stale;
        }
    }

    let linked = locks
        .slot(plan.src_parent.id)
        .and_then(|slot| slot.directory().ok())
        .and_then(|entries| entries.lookup(plan.src_name));
    if linked != Some(plan.child.id) {
        return Attempt::Stale;
    }

    match rewalk(locks, plan.src_parent_path, plan.src_parent.id, plan.child.id) {
        Rewalk::Reached => {}
        Rewalk::Contended => return Attempt::Contended,
        Rewalk::Stale | Rewalk::ThroughChild => return Attempt::Stale,
    }
    match rewalk(locks, plan.dst_parent_path, plan.dst_parent.id, plan.child.id) {
        Rewalk::Reached => {}
        Rewalk::Contended => return Attempt::Contended,
        Rewalk::Stale => return Attempt::Stale,
        Rewalk::ThroughChild => return Attempt::Done(Err(FsError::InvalidMove)),
    }

    Attempt::Done(commit(store, locks, plan))
}

/// Walk `components` from the root, reusing held locks and taking read locks
/// on the rest without blocking, and check that it ends at `expected`.
fn rewalk(locks: &mut LockSet<'_>, components: &[&str], expected: NodeId, child: NodeId) -> Rewalk {
    let mut current = ROOT;
    for depth in 0..=components.len() {
        if current == child {
            return Rewalk::ThroughChild;
        }
        if locks.mode_of(current).is_none() && !locks.try_acquire(current, LockMode::Read) {
            return Rewalk::Contended;
        }
        let Some(name) = components.get(depth) else {
            break;
        };
        let next = locks
            .slot(current)
            .and_then(|slot| slot.directory().ok())
            .and_then(|entries| entries.lookup(name));
        match next {
            Some(next) => current = next,
            None => return Rewalk::Stale,
        }
    }
    if current == expected {
        Rewalk::Reached
    } else {
        Rewalk::Stale
    }
}

/// Detach from the source parent and attach under the destination parent.
/// Every check that can fail runs before the detach.
fn commit(store: &NodeStore, locks: &mut LockSet<'_>, plan: &Plan<'_>) -> FsResult<()> {
    let same_parent = plan.src_parent.id == plan.dst_parent.id;
    {
        let dst_entries = locks
            .slot(plan.dst_parent.id)
            .ok_or(FsError::NotFound)?
            .directory()?;
        if dst_entries.lookup(plan.dst_name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if !same_parent && !dst_entries.has_free_slot() {
            return Err(FsError::NoFreeSlot);
        }
    }

    store.mutate_payload(locks, plan.src_parent.id, |payload| {
        payload
            .entries_mut()?
            .remove(plan.src_name)
            .ok_or(FsError::NotFound)
    })?;

    let attached = store.mutate_payload(locks, plan.dst_parent.id, |payload| {
        payload.entries_mut()?.insert(plan.dst_name, plan.child.id)
    });
    if let Err(err) = attached {
        // Put the node back where it was so it is never left detached.
        store.mutate_payload(locks, plan.src_parent.id, |payload| {
            payload.entries_mut()?.insert(plan.src_name, plan.child.id)
        })?;
        return Err(err);
    }
    Ok(())
}
