//! In-memory collaborators for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::net::{Network, NetworkError, Request, Response};
use crate::notify::{Clients, Notification, Notifier, WindowClient};

enum Scripted {
    Respond(Response),
    Fail,
}

/// Serves scripted responses; unscripted URLs fail like an offline network.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn respond(&self, url: Url, response: Response) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Respond(response));
    }

    pub fn fail(&self, url: Url) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Fail);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.routes.lock().unwrap().get(request.url.as_str()) {
            Some(Scripted::Respond(response)) => Ok(response.clone()),
            Some(Scripted::Fail) | None => {
                Err(NetworkError::Unreachable(format!("offline: {}", request.url)))
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    closed: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> anyhow::Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self, tag: &str) -> anyhow::Result<()> {
        self.closed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeClients {
    windows: Mutex<Vec<WindowClient>>,
    focused: Mutex<Vec<String>>,
    opened: Mutex<Vec<Url>>,
    claims: AtomicUsize,
}

impl FakeClients {
    pub fn add(&self, window: WindowClient) {
        self.windows.lock().unwrap().push(window);
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clients for FakeClients {
    async fn match_all(&self) -> anyhow::Result<Vec<WindowClient>> {
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn focus(&self, id: &str) -> anyhow::Result<()> {
        self.focused.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }

    async fn claim(&self) -> anyhow::Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
