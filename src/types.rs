//! Core types for the treefs inode table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of slots in the inode table.
pub const INODE_TABLE_SIZE: usize = 50;

/// Default number of entry slots in each directory.
pub const MAX_DIR_ENTRIES: usize = 20;

/// Maximum length in bytes of a full path.
pub const MAX_PATH_LEN: usize = 100;

/// Maximum length in bytes of a single path component.
pub const MAX_NAME_LEN: usize = 100;

/// The root directory always lives in slot zero and is never freed.
pub const ROOT: NodeId = NodeId(0);

/// NodeId: index of a slot in the inode table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_root(self) -> bool {
        self == ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    /// Single-letter tag used by the command line protocol.
    pub fn tag(self) -> char {
        match self {
            NodeKind::File => 'f',
            NodeKind::Directory => 'd',
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "f" => Some(NodeKind::File),
            "d" => Some(NodeKind::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => f.write_str("file"),
            NodeKind::Directory => f.write_str("directory"),
        }
    }
}

/// A node id paired with the slot generation it was observed at.
///
/// Slots are reused after a free; comparing generations is how a holder of a
/// stale handle notices that the slot now belongs to a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: NodeId,
    pub generation: u64,
}
