//! Directory entry index
//!
//! A fixed number of `(name, target)` slots stored inside a directory inode.
//! Lookups, inserts and removals are linear scans; fan-out is small.

use crate::error::{FsError, FsResult};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// A single occupied directory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub target: NodeId,
}

/// Fixed-capacity entry table of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntries {
    slots: Vec<Option<DirEntry>>,
}

impl DirEntries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.target)
    }

    /// Link `target` under `name` in the first free slot.
    pub fn insert(&mut self, name: &str, target: NodeId) -> FsResult<()> {
        if self.lookup(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(FsError::NoFreeSlot)?;
        *slot = Some(DirEntry {
            name: name.to_string(),
            target,
        });
        Ok(())
    }

    /// Unlink the entry called `name`, returning its target.
    pub fn remove(&mut self, name: &str) -> Option<NodeId> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(entry) if entry.name == name))?;
        slot.take().map(|entry| entry.target)
    }

    /// Iterate over occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().flatten()
    }
}
