//! SQLite-backed storage for the offline engine.
//!
//! This module provides two independent stores using SQLite with async
//! access via tokio-rusqlite:
//!
//! - The content cache: named, versioned generations of request-keyed
//!   responses
//! - The record store: best-effort decoded JSON payloads keyed by
//!   path and query
//!
//! Both use automatic schema migrations and WAL mode.

pub mod connection;
pub mod entries;
pub mod migrations;
pub mod records;
pub mod registry;

pub use crate::Error;

pub use connection::ContentCache;
pub use entries::GenerationInfo;
pub use records::{Lookup, RecordStore, StoredRecord, WriteOutcome};
pub use registry::{Generations, Role};
