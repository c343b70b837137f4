//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::TreeFsConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the standard sources, with `path` (when given)
    /// taking the place of the working-directory `treefs.toml`.
    pub fn load(path: Option<&Path>) -> Result<TreeFsConfig, ApiError> {
        let config = MergeService::load(path)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> TreeFsConfig {
        TreeFsConfig::default()
    }

    fn validate(config: &TreeFsConfig) -> Result<(), ApiError> {
        if config.store.inode_table_size == 0 {
            return Err(ApiError::ConfigError(
                "store.inode_table_size must be at least 1".to_string(),
            ));
        }
        if config.server.threads == 0 || config.batch.threads == 0 {
            return Err(ApiError::ConfigError(
                "thread counts must be at least 1".to_string(),
            ));
        }
        if config.batch.queue_depth == 0 {
            return Err(ApiError::ConfigError(
                "batch.queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
