//! Source composition for configuration loading.

pub mod policy;
pub mod service;
