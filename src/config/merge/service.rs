//! MergeService: orchestrates sources, applies merge policy, deserializes to TreeFsConfig.

use crate::config::sources::{environment, global_file, local_file};
use crate::config::TreeFsConfig;
use config::ConfigError;
use std::path::Path;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> local file -> environment (highest).
    pub fn load(path: Option<&Path>) -> Result<TreeFsConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = local_file::add_to_builder(builder, path)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}
