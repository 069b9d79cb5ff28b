//! ShoreSquad core - the offline cache manager behind the ShoreSquad PWA.
//!
//! The crate models the app's service worker as a plain Rust value:
//!
//! - `cache`: versioned cache generations (in memory or on disk)
//! - `net`: request/response types and the `Network` seam (reqwest in production)
//! - `notify`: push payloads, notifications, and the host-side `Notifier`/`Clients` seams
//! - `worker`: the `ServiceWorker` dispatch object (install, activate, fetch, push, click)
//! - `config`: the `WorkerConfig` every worker is constructed from

pub mod cache;
pub mod config;
pub mod net;
pub mod notify;
pub mod worker;

pub use cache::{Cache, CacheError, CacheStorage, CachedResponse, RequestKey};
pub use config::{ConfigError, NotificationConfig, WorkerConfig};
pub use net::{HttpNetwork, Network, NetworkError, Request, RequestMode, Response, ResponseType};
pub use notify::{ClickOutcome, Clients, Notification, Notifier, PushPayload, WindowClient};
pub use worker::{ActivationReport, FetchOutcome, InstallReport, ServiceWorker, WorkerError, WorkerState};

pub use reqwest::Method;
pub use url::Url;
