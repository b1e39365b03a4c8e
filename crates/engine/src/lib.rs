//! Offline-first request routing for tidecache.
//!
//! Every intercepted request is classified into a [`RouteCategory`] and
//! handed to the [`Strategy`] registered for it:
//!
//! - chunks: network first, stub module when nothing is cached
//! - data: network first, cached response, then the record store
//! - navigation: network first, then the shell and the offline document
//! - static assets: cache first, placeholder image when offline
//!
//! Non-GET requests and anything unclassified pass straight through.

pub mod classify;
pub mod context;
pub mod engine;
pub mod fallback;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use classify::{Classifier, RouteCategory};
pub use context::{Background, Context};
pub use engine::{Engine, GenerationStatus};
pub use lifecycle::{ActivateReport, ControlMessage, ControlReply, InstallReport, Lifecycle};
pub use strategy::{Dispatch, RouteTable, Strategy};
