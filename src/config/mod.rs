//! Configuration
//!
//! Layered configuration for treefs: built-in defaults, then the global config
//! file, then an explicit or working-directory `treefs.toml`, then `TREEFS__*`
//! environment variables.

pub mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::types::{INODE_TABLE_SIZE, MAX_DIR_ENTRIES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeFsConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inode table sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_inode_table_size")]
    pub inode_table_size: usize,
    #[serde(default = "default_max_dir_entries")]
    pub max_dir_entries: usize,
}

fn default_inode_table_size() -> usize {
    INODE_TABLE_SIZE
}

fn default_max_dir_entries() -> usize {
    MAX_DIR_ENTRIES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            inode_table_size: default_inode_table_size(),
            max_dir_entries: default_max_dir_entries(),
        }
    }
}

/// Retry policy for the move operation's lock acquisition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Retries that only yield before waiting starts
    #[serde(default = "default_spin_retries")]
    pub spin_retries: u32,
    /// Initial upper bound of the randomized wait (microseconds)
    #[serde(default = "default_base_delay_us")]
    pub base_delay_us: u64,
    /// Cap on the randomized wait (microseconds)
    #[serde(default = "default_max_delay_us")]
    pub max_delay_us: u64,
}

fn default_spin_retries() -> u32 {
    4
}

fn default_base_delay_us() -> u64 {
    50
}

fn default_max_delay_us() -> u64 {
    5_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            spin_retries: default_spin_retries(),
            base_delay_us: default_base_delay_us(),
            max_delay_us: default_max_delay_us(),
        }
    }
}

/// Request server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_socket() -> PathBuf {
    PathBuf::from("/tmp/treefs.sock")
}

fn default_threads() -> usize {
    4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            threads: default_threads(),
        }
    }
}

/// Batch runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Commands buffered between the reader and the workers
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_queue_depth() -> usize {
    10
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            queue_depth: default_queue_depth(),
        }
    }
}
