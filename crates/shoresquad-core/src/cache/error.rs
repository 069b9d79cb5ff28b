use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Only GET requests can be cached, got {0}")]
    UnsupportedMethod(String),

    #[error("Invalid cache name: {0:?}")]
    InvalidName(String),

    #[error("Cache generation not found: {0}")]
    NotFound(String),

    #[error("Failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode cache generation {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
