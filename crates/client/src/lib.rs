//! Client code for tidecache.
//!
//! This crate provides the HTTP transport the engine talks to the origin
//! through, and the URL handling hosts use to turn user input into
//! engine requests.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve};
