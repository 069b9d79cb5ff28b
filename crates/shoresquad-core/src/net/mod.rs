//! Network access for the offline cache manager.
//!
//! This module provides the `Request`/`Response` snapshots the worker passes
//! around, the `Network` trait it fetches through, and `HttpNetwork`, the
//! reqwest-backed implementation used outside of tests.

pub mod client;
pub mod error;
pub mod message;

pub use client::{HttpNetwork, Network};
pub use error::NetworkError;
pub use message::{Request, RequestMode, Response, ResponseType};
