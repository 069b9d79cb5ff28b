//! Worker configuration.
//!
//! Everything the offline cache manager needs to know about its deployment
//! (cache version, origin, app shell, notification metadata) lives in a
//! `WorkerConfig` value handed to the worker at construction time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Cache generation name for the current deployment.
const DEFAULT_CACHE_VERSION: &str = "shoresquad-v1";

/// Origin the app is served from during local development.
const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

const DEFAULT_ROOT_PATH: &str = "/";

/// App shell: everything needed to boot the page offline.
const DEFAULT_APP_SHELL: [&str; 5] = [
    "/",
    "/index.html",
    "/css/styles.css",
    "/js/app.js",
    "/manifest.json",
];

const DEFAULT_NOTIFICATION_TITLE: &str = "ShoreSquad";
const DEFAULT_NOTIFICATION_BODY: &str = "New beach cleanup event near you!";
const DEFAULT_NOTIFICATION_ICON: &str = "/icons/icon-192x192.png";
const DEFAULT_NOTIFICATION_BADGE: &str = "/icons/badge-72x72.png";
const DEFAULT_NOTIFICATION_TAG: &str = "shoresquad-notification";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Origin {0:?} cannot be used as a base URL")]
    NotABase(String),

    #[error("Invalid path {path:?}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cache_version must not be empty")]
    EmptyVersion,

    #[error("App shell lists {0} more than once")]
    DuplicateShellEntry(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Name of the current cache generation. Bump it to invalidate every
    /// previously cached response on the next activation.
    pub cache_version: String,
    pub origin: String,
    pub root_path: String,
    pub app_shell: Vec<String>,
    pub notifications: NotificationConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            root_path: DEFAULT_ROOT_PATH.to_string(),
            app_shell: DEFAULT_APP_SHELL.iter().map(|p| p.to_string()).collect(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin).map_err(|source| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(self.origin.clone()));
        }
        Ok(url)
    }

    /// Resolve a path (or absolute URL) against the configured origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        let mut url = self
            .origin_url()?
            .join(path)
            .map_err(|source| ConfigError::InvalidPath {
                path: path.to_string(),
                source,
            })?;
        url.set_fragment(None);
        Ok(url)
    }

    pub fn root_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.root_path)
    }

    /// App shell entries resolved to absolute URLs, in manifest order.
    pub fn app_shell_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.app_shell.iter().map(|path| self.resolve(path)).collect()
    }

    /// Check the config is usable before a worker is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        self.root_url()?;

        let mut seen = HashSet::new();
        for url in self.app_shell_urls()? {
            if !seen.insert(url.clone()) {
                return Err(ConfigError::DuplicateShellEntry(url.to_string()));
            }
        }
        Ok(())
    }
}

/// Fixed metadata attached to every push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub title: String,
    /// Body used when a push arrives without one.
    pub default_body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub vibrate: Vec<u32>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            default_body: DEFAULT_NOTIFICATION_BODY.to_string(),
            icon: DEFAULT_NOTIFICATION_ICON.to_string(),
            badge: DEFAULT_NOTIFICATION_BADGE.to_string(),
            tag: DEFAULT_NOTIFICATION_TAG.to_string(),
            vibrate: vec![100, 50, 100],
        }
    }
}
