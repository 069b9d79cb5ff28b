//! Versioned response cache.
//!
//! This module provides `CacheStorage`, a set of named cache generations
//! modelled on the browser's Cache Storage API. Each generation maps a
//! `RequestKey` (method + normalized URL) to a buffered response snapshot.
//!
//! Storage is either in memory or backed by a directory holding one JSON
//! file per generation. Files are rewritten whole through a temp file and
//! a rename, so a reader never sees half an entry or half a batch.

pub mod error;
pub mod key;
pub mod storage;

pub use error::CacheError;
pub use key::RequestKey;
pub use storage::{Cache, CacheStorage, CachedResponse};
