//! Integration tests for the treefs filesystem, batch runner and server

mod concurrency;
mod invariants;
mod scenarios;
mod server;
