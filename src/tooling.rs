//! Tooling Layer
//!
//! Command-line surface for treefs: batch replay, the request server, and a
//! one-shot client.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, DumpFormat};
