//! Tree operations
//!
//! [`FileSystem`] owns the inode table and exposes the five operations. Each
//! call builds its own lock set, runs its locking protocol, and releases every
//! lock before it returns.

pub mod path;
pub mod printer;
pub mod resolver;

mod mutate;
mod relocate;

pub use printer::TreeSnapshot;

use crate::concurrency::{LockMode, LockSet, ReleaseSignal};
use crate::config::{BackoffConfig, TreeFsConfig};
use crate::error::FsResult;
use crate::store::NodeStore;
use crate::types::{NodeId, NodeKind};
use std::io::{self, Write};
use tracing::{info, warn};

/// Shared in-memory filesystem.
pub struct FileSystem {
    store: NodeStore,
    backoff: BackoffConfig,
    released: ReleaseSignal,
}

impl FileSystem {
    pub fn new(config: &TreeFsConfig) -> Self {
        Self::with_store(NodeStore::new(&config.store), config.backoff)
    }

    pub fn with_store(store: NodeStore, backoff: BackoffConfig) -> Self {
        Self {
            store,
            backoff,
            released: ReleaseSignal::new(),
        }
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Create a file or directory at `path`, returning its node id.
    pub fn create(&self, path: &str, kind: NodeKind) -> FsResult<NodeId> {
        let result = mutate::create(&self.store, path, kind);
        match &result {
            Ok(id) => info!(node = %id, "Create {}: {}", kind, path),
            Err(err) => warn!("Create {}: {} failed: {}", kind, path, err),
        }
        result
    }

    /// Remove the file or empty directory at `path`.
    pub fn delete(&self, path: &str) -> FsResult<()> {
        match mutate::delete(&self.store, path) {
            Ok(id) => {
                info!(node = %id, "Delete: {}", path);
                Ok(())
            }
            Err(err) => {
                warn!("Delete: {} failed: {}", path, err);
                Err(err)
            }
        }
    }

    /// Resolve `path` to a node id.
    pub fn lookup(&self, path: &str) -> FsResult<NodeId> {
        let components = path::components(path)?;
        let mut locks = LockSet::new(&self.store);
        let result = resolver::walk(&mut locks, &components, LockMode::Read);
        drop(locks);
        match &result {
            Ok(id) => info!(node = %id, "Search: {} found", path),
            Err(err) => info!("Search: {} not found ({})", path, err),
        }
        result
    }

    /// Move the node at `src` to `dst`, possibly under a new name.
    pub fn move_node(&self, src: &str, dst: &str) -> FsResult<()> {
        let result = relocate::move_node(&self.store, &self.released, self.backoff, src, dst);
        match &result {
            Ok(()) => info!("Moving: {} to {}", src, dst),
            Err(err) => warn!("Moving: {} to {} failed: {}", src, dst, err),
        }
        result
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> TreeSnapshot {
        printer::snapshot(&self.store)
    }

    /// Write the indented tree dump to `out`.
    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.snapshot().write_text(out)
    }
}
