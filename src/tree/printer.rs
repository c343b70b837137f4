//! Tree dump
//!
//! Depth-first walk from the root. Each directory stays read-locked while its
//! subtree is visited, so a dump taken alongside other operations is still a
//! tree: nothing can be moved out of or into a subtree mid-visit.

use crate::concurrency::{LockMode, LockSet};
use crate::store::NodeStore;
use crate::types::{NodeId, NodeKind, ROOT};
use serde::Serialize;
use std::io::{self, Write};

/// Serializable copy of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub name: String,
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Number of nodes in this subtree, itself included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeSnapshot::count).sum::<usize>()
    }

    /// Indented text form: two spaces per level, directories end in `/`.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.write_level(out, 0)
    }

    fn write_level<W: Write>(&self, out: &mut W, depth: usize) -> io::Result<()> {
        let suffix = match (self.kind, self.name.as_str()) {
            (NodeKind::Directory, "/") | (NodeKind::File, _) => "",
            (NodeKind::Directory, _) => "/",
        };
        writeln!(out, "{:indent$}{}{}", "", self.name, suffix, indent = depth * 2)?;
        for child in &self.children {
            child.write_level(out, depth + 1)?;
        }
        Ok(())
    }
}

pub fn snapshot(store: &NodeStore) -> TreeSnapshot {
    let mut locks = LockSet::new(store);
    visit(store, &mut locks, ROOT, "/".to_string())
}

fn visit(store: &NodeStore, locks: &mut LockSet<'_>, id: NodeId, name: String) -> TreeSnapshot {
    locks.acquire(id, LockMode::Read);
    let record = match store.get(locks, id) {
        Ok(record) => record,
        Err(err) => panic!("inode {} reachable from the root is unusable: {}", id, err),
    };

    let children = record
        .children
        .into_iter()
        .map(|entry| visit(store, locks, entry.target, entry.name))
        .collect();
    locks.release(id);

    TreeSnapshot {
        name,
        id,
        kind: record.kind,
        children,
    }
}
