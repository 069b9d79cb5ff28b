use thiserror::Error;

use super::WorkerState;
use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::net::NetworkError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid worker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },

    #[error("Install failed fetching {url}: {source}")]
    Install {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("Offline and no cached fallback for {url}: {source}")]
    Offline {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}
