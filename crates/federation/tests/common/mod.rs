//! Test infrastructure for the federation core.
//!
//! Provides in-memory catalog clients that answer, fail or hang on demand,
//! a client factory handing them out by metastore name, and fixtures for
//! building routing tables over them.

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_client;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_client::*;
