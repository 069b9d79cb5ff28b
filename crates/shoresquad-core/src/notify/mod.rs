//! Push notifications and page clients.
//!
//! The worker never talks to the platform directly. It displays
//! notifications through a `Notifier` and finds or opens windows through
//! `Clients`, both supplied by the host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::NotificationConfig;

/// JSON body of a push message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PushPayload {
    #[serde(default)]
    pub body: Option<String>,
}

impl PushPayload {
    /// Decode a raw push payload. Missing or malformed data decodes to the
    /// empty payload.
    pub fn decode(data: Option<&[u8]>) -> Self {
        let Some(bytes) = data else {
            return Self::default();
        };
        match serde_json::from_slice(bytes) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Push payload is not valid JSON, using defaults");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub vibrate: Vec<u32>,
}

impl Notification {
    /// An empty body counts as no body at all.
    pub fn from_push(config: &NotificationConfig, payload: PushPayload) -> Self {
        Self {
            title: config.title.clone(),
            body: payload
                .body
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| config.default_body.clone()),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            tag: config.tag.clone(),
            vibrate: config.vibrate.clone(),
        }
    }
}

/// An open window controlled (or not yet controlled) by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An existing window at the site root was focused.
    Focused(String),
    /// No window was at the site root, so a new one was opened.
    Opened,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> anyhow::Result<()>;

    async fn close(&self, tag: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Clients: Send + Sync {
    /// Every window client, including ones the worker does not control yet.
    async fn match_all(&self) -> anyhow::Result<Vec<WindowClient>>;

    async fn focus(&self, id: &str) -> anyhow::Result<()>;

    async fn open_window(&self, url: &Url) -> anyhow::Result<()>;

    /// Take control of every open page without waiting for a reload.
    async fn claim(&self) -> anyhow::Result<()>;
}
