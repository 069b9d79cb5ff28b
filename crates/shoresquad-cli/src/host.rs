//! Terminal stand-ins for the browser's notification and window surfaces.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use shoresquad_core::{Clients, Notification, Notifier, Url, WindowClient};
use tracing::info;

/// Prints notifications instead of raising system ones.
pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        println!("[{}] {}", notification.title, notification.body);
        println!("  icon={} badge={} tag={}", notification.icon, notification.badge, notification.tag);
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        info!(tag = tag, "Notification closed");
        Ok(())
    }
}

/// A fixed set of pretend browser windows, given on the command line.
pub struct TerminalClients {
    windows: Mutex<Vec<WindowClient>>,
}

impl TerminalClients {
    pub fn new(urls: &[Url]) -> Self {
        let windows = urls
            .iter()
            .enumerate()
            .map(|(i, url)| WindowClient {
                id: format!("window-{}", i + 1),
                url: url.clone(),
                focused: false,
            })
            .collect();
        Self {
            windows: Mutex::new(windows),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<WindowClient>>> {
        self.windows
            .lock()
            .map_err(|_| anyhow::anyhow!("window list lock poisoned"))
    }
}

#[async_trait]
impl Clients for TerminalClients {
    async fn match_all(&self) -> Result<Vec<WindowClient>> {
        Ok(self.lock()?.clone())
    }

    async fn focus(&self, id: &str) -> Result<()> {
        let mut windows = self.lock()?;
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        println!("Focused {}", id);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<()> {
        let mut windows = self.lock()?;
        let id = format!("window-{}", windows.len() + 1);
        windows.push(WindowClient {
            id: id.clone(),
            url: url.clone(),
            focused: true,
        });
        println!("Opened {} at {}", id, url);
        Ok(())
    }

    async fn claim(&self) -> Result<()> {
        info!(windows = self.lock()?.len(), "Claimed open windows");
        Ok(())
    }
}
