//! Path Resolver
//!
//! Lock-coupled walks from the root. Every node visited stays locked in the
//! caller's [`LockSet`] until the caller's operation ends, so the resolved path
//! cannot change underneath it.

use crate::concurrency::{LockMode, LockSet};
use crate::error::{FsError, FsResult};
use crate::store::NodeStore;
use crate::types::{NodeHandle, NodeId, NodeKind, ROOT};

/// Walk `components` from the root. Intermediate nodes are read-locked; the
/// node the path names is locked in `last`.
pub fn walk<'a>(
    locks: &mut LockSet<'a>,
    components: &[&str],
    last: LockMode,
) -> FsResult<NodeId> {
    let mode_at = |depth: usize| {
        if depth == components.len() {
            last
        } else {
            LockMode::Read
        }
    };

    locks.acquire(ROOT, mode_at(0));
    check_root(locks);

    let mut current = ROOT;
    for (depth, name) in components.iter().enumerate() {
        let entries = locks.slot(current).ok_or(FsError::NotFound)?.directory()?;
        let next = entries.lookup(name).ok_or(FsError::NotFound)?;
        locks.acquire(next, mode_at(depth + 1));
        if !locks.slot(next).is_some_and(|slot| slot.is_allocated()) {
            panic!("directory entry {:?} in inode {} points at a free inode {}", name, current, next);
        }
        current = next;
    }
    Ok(current)
}

/// Resolve `components` to a handle and release every lock before returning.
///
/// The handle is only a hint: by the time the caller uses it the node may be
/// gone, so it must be checked against the slot generation under lock.
pub fn resolve_handle(store: &NodeStore, components: &[&str]) -> FsResult<NodeHandle> {
    let mut locks = LockSet::new(store);
    let id = walk(&mut locks, components, LockMode::Read)?;
    let generation = locks.slot(id).ok_or(FsError::NotFound)?.generation();
    Ok(NodeHandle { id, generation })
}

fn check_root(locks: &LockSet<'_>) {
    let kind = locks.slot(ROOT).and_then(|slot| slot.kind());
    if kind != Some(NodeKind::Directory) {
        panic!("root inode is not a directory: {:?}", kind);
    }
}
