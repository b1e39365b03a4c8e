//! Core types and shared functionality for tidecache.
//!
//! This crate provides:
//! - Content cache generations and the record store, SQLite backed
//! - HTTP-shaped request/response values and the network seam
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod net;

pub use cache::{ContentCache, Generations, Lookup, RecordStore, Role, StoredRecord};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{CacheMode, Destination, Request, RequestMode, Response};
pub use net::Network;
