//! The offline cache manager.
//!
//! `ServiceWorker` exposes one async method per trigger the hosting runtime
//! emits. The host awaits each one before it considers the corresponding
//! lifecycle phase (or request) finished:
//!
//! - `install`: build the app-shell cache for the current version
//! - `activate`: delete every stale cache generation, claim open pages
//! - `handle_fetch`: cache-first lookup with network fallback
//! - `handle_push`: show a notification
//! - `handle_notification_click`: focus or open the site

pub mod dispatch;
pub mod error;
pub mod lifecycle;

#[cfg(test)]
mod testing;

pub use dispatch::{ActivationReport, FetchOutcome, InstallReport, ServiceWorker};
pub use error::WorkerError;
pub use lifecycle::WorkerState;
