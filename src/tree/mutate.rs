//! create and delete
//!
//! Both follow root-to-leaf lock coupling: the walk leaves the parent
//! write-locked, then the child is write-locked beneath it.

use super::{path, resolver};
use crate::concurrency::{LockMode, LockSet};
use crate::error::{FsError, FsResult};
use crate::store::{NodeStore, Payload};
use crate::types::{NodeId, NodeKind};

pub(super) fn create(store: &NodeStore, target: &str, kind: NodeKind) -> FsResult<NodeId> {
    let components = path::components(target)?;
    let (parent_path, name) = path::split_parent_child(&components)?;

    let mut locks = LockSet::new(store);
    let parent = resolver::walk(&mut locks, parent_path, LockMode::Write)?;

    let entries = locks.slot(parent).ok_or(FsError::NotFound)?.directory()?;
    if entries.lookup(name).is_some() {
        return Err(FsError::AlreadyExists);
    }
    if !entries.has_free_slot() {
        return Err(FsError::NoFreeSlot);
    }

    let child = store.allocate(kind)?;
    locks.acquire(child, LockMode::Write);

    let inserted = store.mutate_payload(&mut locks, parent, |payload| {
        payload.entries_mut()?.insert(name, child)
    });
    if let Err(err) = inserted {
        store.free(&mut locks, child)?;
        return Err(err);
    }
    Ok(child)
}

pub(super) fn delete(store: &NodeStore, target: &str) -> FsResult<NodeId> {
    let components = path::components(target)?;
    let (parent_path, name) = path::split_parent_child(&components)?;

    let mut locks = LockSet::new(store);
    let parent = resolver::walk(&mut locks, parent_path, LockMode::Write)?;

    let child = locks
        .slot(parent)
        .ok_or(FsError::NotFound)?
        .directory()?
        .lookup(name)
        .ok_or(FsError::NotFound)?;
    locks.acquire(child, LockMode::Write);

    if let Some(Payload::Directory(entries)) = locks.slot(child).and_then(|slot| slot.payload()) {
        if !entries.is_empty() {
            return Err(FsError::NotEmpty);
        }
    }

    store.mutate_payload(&mut locks, parent, |payload| {
        payload.entries_mut()?.remove(name).ok_or(FsError::NotFound)
    })?;
    store.free(&mut locks, child)?;
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ROOT;

    #[test]
    fn test_create_links_new_node() {
        let store = NodeStore::with_capacity(8, 4);
        let a = create(&store, "/a", NodeKind::Directory).unwrap();
        let b = create(&store, "/a/b", NodeKind::File).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.allocated_count(), 3);

        let locks = {
            let mut locks = LockSet::new(&store);
            locks.acquire(a, LockMode::Read);
            locks
        };
        let record = store.get(&locks, a).unwrap();
        assert_eq!(record.children.len(), 1);
        assert_eq!(record.children[0].name, "b");
        assert_eq!(record.children[0].target, b);
    }

    #[test]
    fn test_create_failures_leave_table_untouched() {
        let store = NodeStore::with_capacity(8, 1);
        create(&store, "/f", NodeKind::File).unwrap();
        let before = store.allocated_count();

        assert_eq!(create(&store, "/f", NodeKind::File), Err(FsError::AlreadyExists));
        assert_eq!(create(&store, "/g", NodeKind::File), Err(FsError::NoFreeSlot));
        assert_eq!(create(&store, "/f/x", NodeKind::File), Err(FsError::NotADirectory));
        assert_eq!(create(&store, "/none/x", NodeKind::File), Err(FsError::NotFound));
        assert_eq!(create(&store, "/", NodeKind::Directory), Err(FsError::InvalidPath));
        assert_eq!(store.allocated_count(), before);
    }

    #[test]
    fn test_create_table_full() {
        let store = NodeStore::with_capacity(2, 4);
        create(&store, "/a", NodeKind::File).unwrap();
        assert_eq!(create(&store, "/b", NodeKind::File), Err(FsError::TableFull));

        let mut locks = LockSet::new(&store);
        locks.acquire(ROOT, LockMode::Read);
        assert_eq!(store.get(&locks, ROOT).unwrap().children.len(), 1);
    }

    #[test]
    fn test_delete_rules() {
        let store = NodeStore::with_capacity(8, 4);
        create(&store, "/a", NodeKind::Directory).unwrap();
        let b = create(&store, "/a/b", NodeKind::File).unwrap();

        assert_eq!(delete(&store, "/a"), Err(FsError::NotEmpty));
        assert_eq!(delete(&store, "/a/b"), Ok(b));
        assert_eq!(delete(&store, "/a/b"), Err(FsError::NotFound));
        assert!(delete(&store, "/a").is_ok());
        assert_eq!(delete(&store, "/"), Err(FsError::InvalidPath));
        assert_eq!(store.allocated_count(), 1);
    }
}
