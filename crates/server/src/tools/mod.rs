//! MCP tool implementations.
//!
//! This module contains all tools exposed by the tidecache server.

pub mod cache;
pub mod fetch;

pub use fetch::{OfflineFetchOutput, OfflineFetchParams};
