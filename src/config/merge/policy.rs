//! Built-in defaults, registered as the lowest-precedence source.

use crate::config::TreeFsConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder seeded with every default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = TreeFsConfig::default();
    Config::builder()
        .set_default("store.inode_table_size", defaults.store.inode_table_size as u64)?
        .set_default("store.max_dir_entries", defaults.store.max_dir_entries as u64)?
        .set_default("backoff.spin_retries", defaults.backoff.spin_retries as u64)?
        .set_default("backoff.base_delay_us", defaults.backoff.base_delay_us)?
        .set_default("backoff.max_delay_us", defaults.backoff.max_delay_us)?
        .set_default(
            "server.socket",
            defaults.server.socket.to_string_lossy().to_string(),
        )?
        .set_default("server.threads", defaults.server.threads as u64)?
        .set_default("batch.threads", defaults.batch.threads as u64)?
        .set_default("batch.queue_depth", defaults.batch.queue_depth as u64)
}
