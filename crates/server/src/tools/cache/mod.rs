//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and managing the engine's
//! content generations and record store.

pub mod clear;
pub mod status;
pub mod warm;

pub use clear::clear_impl;
pub use status::{CacheStatusOutput, status_impl};
pub use warm::{CacheWarmParams, warm_impl};
