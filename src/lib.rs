//! treefs: Concurrent In-Memory Filesystem
//!
//! A hierarchical filesystem held in a fixed-size inode table and shared by
//! many threads. Operations lock only the nodes they touch: lookups, creates
//! and deletes couple locks down the path, and moves take their locks in id
//! order with non-blocking attempts and backoff.

pub mod batch;
pub mod client;
pub mod command;
pub mod concurrency;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod server;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use error::{ApiError, FsError, FsResult};
pub use tree::FileSystem;
pub use types::{NodeId, NodeKind};
