//! Node Store
//!
//! Fixed-capacity inode table. Every slot owns one reader/writer lock guarding
//! its kind and payload; the set of free slot ids has a lock of its own that is
//! only ever held for the duration of a pop or a push.

pub mod dir;

pub use dir::{DirEntries, DirEntry};

use crate::concurrency::LockSet;
use crate::config::StoreConfig;
use crate::error::{FsError, FsResult};
use crate::types::{NodeHandle, NodeId, NodeKind, ROOT};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Kind-dependent node content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    File,
    Directory(DirEntries),
}

impl Payload {
    pub fn kind(&self) -> NodeKind {
        match self {
            Payload::File => NodeKind::File,
            Payload::Directory(_) => NodeKind::Directory,
        }
    }

    pub fn entries_mut(&mut self) -> FsResult<&mut DirEntries> {
        match self {
            Payload::Directory(entries) => Ok(entries),
            Payload::File => Err(FsError::NotADirectory),
        }
    }
}

/// Contents of one inode table slot
#[derive(Debug)]
pub struct NodeSlot {
    generation: u64,
    payload: Option<Payload>,
}

impl NodeSlot {
    fn free() -> Self {
        Self {
            generation: 0,
            payload: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_allocated(&self) -> bool {
        self.payload.is_some()
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.payload.as_ref().map(Payload::kind)
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Whether this slot still holds the node `handle` was taken from.
    pub fn matches(&self, handle: NodeHandle) -> bool {
        self.is_allocated() && self.generation == handle.generation
    }

    pub fn directory(&self) -> FsResult<&DirEntries> {
        match &self.payload {
            Some(Payload::Directory(entries)) => Ok(entries),
            Some(Payload::File) => Err(FsError::NotADirectory),
            None => Err(FsError::NotFound),
        }
    }

}

/// NodeRecord: point-in-time snapshot of an allocated node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub children: Vec<DirEntry>,
}

/// The inode table shared by every operation.
pub struct NodeStore {
    nodes: Box<[RwLock<NodeSlot>]>,
    free: Mutex<BTreeSet<NodeId>>,
    dir_capacity: usize,
}

impl NodeStore {
    /// Build the table and allocate the root directory in slot zero.
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_capacity(config.inode_table_size, config.max_dir_entries)
    }

    pub fn with_capacity(table_size: usize, dir_capacity: usize) -> Self {
        assert!(table_size > 0, "inode table needs room for the root");
        let nodes = (0..table_size)
            .map(|_| RwLock::new(NodeSlot::free()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let free = (0..table_size as u32).map(NodeId).collect();
        let store = Self {
            nodes,
            free: Mutex::new(free),
            dir_capacity,
        };

        match store.allocate(NodeKind::Directory) {
            Ok(id) if id == ROOT => {}
            other => panic!("failed to allocate root inode: {:?}", other),
        }
        store
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn dir_capacity(&self) -> usize {
        self.dir_capacity
    }

    /// Number of allocated slots, root included.
    pub fn allocated_count(&self) -> usize {
        self.nodes.len() - self.free.lock().len()
    }

    pub(crate) fn slot_lock(&self, id: NodeId) -> &RwLock<NodeSlot> {
        &self.nodes[id.index()]
    }

    /// Claim the lowest free slot and initialize it as `kind`.
    pub fn allocate(&self, kind: NodeKind) -> FsResult<NodeId> {
        let id = self.free.lock().pop_first().ok_or(FsError::TableFull)?;

        // The slot is unreachable from the tree; the only possible holder is a
        // mover probing a stale handle, which never blocks on it.
        let mut slot = self.nodes[id.index()].write();
        debug_assert!(!slot.is_allocated(), "free set handed out a live slot");
        slot.payload = Some(match kind {
            NodeKind::File => Payload::File,
            NodeKind::Directory => Payload::Directory(DirEntries::with_capacity(self.dir_capacity)),
        });
        debug!(node = %id, %kind, generation = slot.generation, "allocated inode");
        Ok(id)
    }

    /// Return a write-locked slot to the free set.
    pub fn free(&self, locks: &mut LockSet<'_>, id: NodeId) -> FsResult<()> {
        assert!(!id.is_root(), "attempted to free the root inode");
        let slot = locks.slot_mut(id).ok_or(FsError::NotFound)?;
        if slot.payload.take().is_none() {
            return Err(FsError::NotFound);
        }
        slot.generation += 1;
        self.free.lock().insert(id);
        debug!(node = %id, "freed inode");
        Ok(())
    }

    /// Snapshot of a node the caller holds at least a read lock on.
    pub fn get(&self, locks: &LockSet<'_>, id: NodeId) -> FsResult<NodeRecord> {
        let slot = locks.slot(id).ok_or(FsError::NotFound)?;
        let payload = slot.payload().ok_or(FsError::NotFound)?;
        let children = match payload {
            Payload::File => Vec::new(),
            Payload::Directory(entries) => entries.iter().cloned().collect(),
        };
        Ok(NodeRecord {
            id,
            kind: payload.kind(),
            children,
        })
    }

    /// Apply `f` to the payload of a node the caller holds the write lock on.
    pub fn mutate_payload<R>(
        &self,
        locks: &mut LockSet<'_>,
        id: NodeId,
        f: impl FnOnce(&mut Payload) -> FsResult<R>,
    ) -> FsResult<R> {
        let slot = locks.slot_mut(id).ok_or(FsError::NotFound)?;
        let payload = slot.payload.as_mut().ok_or(FsError::NotFound)?;
        f(payload)
    }
}
