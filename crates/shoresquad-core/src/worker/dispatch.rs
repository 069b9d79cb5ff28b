use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::{WorkerError, WorkerState};
use crate::cache::{CacheError, CacheStorage, RequestKey};
use crate::config::WorkerConfig;
use crate::net::{Network, NetworkError, Request, Response};
use crate::notify::{ClickOutcome, Clients, Notification, Notifier, PushPayload};

/// Where a fetch was answered from.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request to the network as-is.
    Passthrough,
    Cache(Response),
    Network(Response),
    /// Network failed; the cached root document stands in.
    Fallback(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Cache(r) | FetchOutcome::Network(r) | FetchOutcome::Fallback(r) => Some(r),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Cache(r) | FetchOutcome::Network(r) | FetchOutcome::Fallback(r) => Some(r),
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Passthrough => "passthrough",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Fallback(_) => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<RequestKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed; they are retried on the next activation.
    pub failed: Vec<String>,
}

impl ActivationReport {
    /// File one stale generation's deletion result. A generation that was
    /// already gone is neither deleted nor failed.
    fn record(&mut self, name: String, result: Result<bool, CacheError>) {
        match result {
            Ok(true) => {
                info!(cache = %name, "Deleted stale cache generation");
                self.deleted.push(name);
            }
            Ok(false) => {
                debug!(cache = %name, "Stale cache generation already gone");
            }
            Err(e) => {
                warn!(cache = %name, error = %e, "Failed to delete stale cache generation");
                self.failed.push(name);
            }
        }
    }
}

/// The offline cache manager for one deployed version.
pub struct ServiceWorker {
    config: WorkerConfig,
    root_url: Url,
    storage: CacheStorage,
    network: Arc<dyn Network>,
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    background: Mutex<JoinSet<()>>,
}

impl ServiceWorker {
    pub fn new(
        config: WorkerConfig,
        storage: CacheStorage,
        network: Arc<dyn Network>,
        notifier: Arc<dyn Notifier>,
        clients: Arc<dyn Clients>,
    ) -> Result<Self, WorkerError> {
        config.validate()?;
        let root_url = config.root_url()?;
        let (state, _) = watch::channel(WorkerState::Parsed);

        Ok(Self {
            config,
            root_url,
            storage,
            network,
            notifier,
            clients,
            state,
            skip_waiting: AtomicBool::new(false),
            background: Mutex::new(JoinSet::new()),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_version
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Whether install asked the runtime to skip the waiting phase.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Worker state changed");
        }
    }

    /// Build the app-shell cache for this version.
    ///
    /// Every app-shell entry is fetched concurrently. Unless all of them come
    /// back ok, nothing is stored, the worker becomes redundant and the
    /// previous version keeps serving.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        let state = self.state();
        if !state.can_install() {
            return Err(WorkerError::InvalidState {
                operation: "install",
                state,
            });
        }
        self.transition(WorkerState::Installing);

        match self.populate_app_shell().await {
            Ok(report) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.transition(WorkerState::Installed);
                info!(cache = %report.cache_name, entries = report.cached.len(), "Install complete");
                Ok(report)
            }
            Err(e) => {
                warn!(cache = %self.cache_name(), error = %e, "Install failed");
                self.transition(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn populate_app_shell(&self) -> Result<InstallReport, WorkerError> {
        let cache = self.storage.open(self.cache_name()).await?;
        let urls = self.config.app_shell_urls()?;

        let requests: Vec<Request> = urls.into_iter().map(Request::get).collect();
        let responses = join_all(requests.iter().map(|request| self.network.fetch(request))).await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(responses) {
            let url = request.url.to_string();
            let response = result.map_err(|source| WorkerError::Install {
                url: url.clone(),
                source,
            })?;
            if !response.ok() {
                return Err(WorkerError::Install {
                    source: NetworkError::from_status(&url, response.status, &response.body),
                    url,
                });
            }
            entries.push((RequestKey::from_request(request), response));
        }

        let cached = entries.iter().map(|(key, _)| key.clone()).collect();
        cache.put_all(entries).await?;

        Ok(InstallReport {
            cache_name: cache.name().to_string(),
            cached,
        })
    }

    /// Record this version's generation as the active one, delete every
    /// other generation, then claim open pages.
    ///
    /// Deletions run concurrently and are all awaited. A failed deletion is
    /// logged and reported but never stops the others or the activation.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let state = self.state();
        if !state.can_activate() {
            return Err(WorkerError::InvalidState {
                operation: "activate",
                state,
            });
        }
        self.transition(WorkerState::Activating);

        // From here on this version's generation is the one that serves
        let current = self.cache_name();
        self.storage.set_active(current).await?;

        let stale: Vec<String> = self
            .storage
            .keys()
            .await
            .into_iter()
            .filter(|name| name != current)
            .collect();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut report = ActivationReport::default();
        for (name, result) in stale.into_iter().zip(results) {
            report.record(name, result);
        }

        self.clients.claim().await?;
        self.transition(WorkerState::Activated);
        Ok(report)
    }

    /// Answer a request cache-first.
    ///
    /// The cache lookup always finishes before the network is tried. A
    /// cacheable network response is stored by a detached task so the
    /// caller never waits on the write.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        if !request.is_get() {
            return Ok(FetchOutcome::Passthrough);
        }

        let key = RequestKey::from_request(request);
        if let Some(cached) = self.storage.match_entry(self.cache_name(), &key).await {
            debug!(url = %key.url, "Cache hit");
            return Ok(FetchOutcome::Cache(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(key, response.clone()).await;
                } else {
                    debug!(
                        url = %key.url,
                        status = response.status,
                        response_type = %response.response_type,
                        "Network response not cacheable"
                    );
                }
                Ok(FetchOutcome::Network(response))
            }
            Err(e) => {
                // Any request type falls back to the root document
                let root = RequestKey::get(&self.root_url);
                match self.storage.match_entry(self.cache_name(), &root).await {
                    Some(fallback) => {
                        debug!(url = %key.url, error = %e, "Network failed, serving cached root document");
                        Ok(FetchOutcome::Fallback(fallback))
                    }
                    None => Err(WorkerError::Offline {
                        url: key.url,
                        source: e,
                    }),
                }
            }
        }
    }

    async fn store_in_background(&self, key: RequestKey, response: Response) {
        let storage = self.storage.clone();
        let cache_name = self.cache_name().to_string();

        let mut background = self.background.lock().await;
        // Reap finished stores so the set stays small
        while background.try_join_next().is_some() {}

        background.spawn(async move {
            let result = match storage.open(&cache_name).await {
                Ok(cache) => cache.put(key.clone(), response).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => debug!(cache = %cache_name, url = %key.url, "Stored network response"),
                Err(e) => warn!(cache = %cache_name, url = %key.url, error = %e, "Failed to store network response"),
            }
        });
    }

    /// Wait for every background cache write spawned so far to finish.
    /// Hosts call this before shutting down; dropping the worker aborts
    /// pending writes.
    ///
    /// The pending set is taken out from under the lock, so fetches that
    /// run meanwhile keep spawning their stores into a fresh set.
    pub async fn wait_for_background(&self) {
        let mut pending = std::mem::take(&mut *self.background.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Background cache write panicked or was cancelled");
            }
        }
    }

    /// Show a notification for a push message.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Notification, WorkerError> {
        let payload = PushPayload::decode(data);
        let notification = Notification::from_push(&self.config.notifications, payload);
        self.notifier.show(&notification).await?;
        debug!(tag = %notification.tag, "Push notification shown");
        Ok(notification)
    }

    /// Close the clicked notification and bring the site forward.
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
    ) -> Result<ClickOutcome, WorkerError> {
        if let Err(e) = self.notifier.close(&notification.tag).await {
            debug!(tag = %notification.tag, error = %e, "Failed to close notification");
        }

        let windows = self.clients.match_all().await?;
        if let Some(window) = windows.iter().find(|w| w.url == self.root_url) {
            self.clients.focus(&window.id).await?;
            return Ok(ClickOutcome::Focused(window.id.clone()));
        }

        self.clients.open_window(&self.root_url).await?;
        Ok(ClickOutcome::Opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::net::ResponseType;
    use crate::notify::WindowClient;
    use crate::worker::testing::{FakeClients, FakeNetwork, RecordingNotifier};
    use reqwest::Method;
    use std::time::Duration;

    const SHELL: [&str; 5] = [
        "/",
        "/index.html",
        "/css/styles.css",
        "/js/app.js",
        "/manifest.json",
    ];

    struct Harness {
        worker: ServiceWorker,
        storage: CacheStorage,
        network: Arc<FakeNetwork>,
        notifier: Arc<RecordingNotifier>,
        clients: Arc<FakeClients>,
    }

    fn harness_with(config: WorkerConfig, storage: CacheStorage) -> Harness {
        let network = Arc::new(FakeNetwork::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clients = Arc::new(FakeClients::default());
        let worker = ServiceWorker::new(
            config,
            storage.clone(),
            network.clone(),
            notifier.clone(),
            clients.clone(),
        )
        .unwrap();
        Harness {
            worker,
            storage,
            network,
            notifier,
            clients,
        }
    }

    fn harness() -> Harness {
        harness_with(WorkerConfig::default(), CacheStorage::in_memory())
    }

    fn url(path: &str) -> Url {
        WorkerConfig::default().resolve(path).unwrap()
    }

    fn serve_shell(network: &FakeNetwork) {
        for path in SHELL {
            network.respond(url(path), Response::basic(&url(path), format!("shell {}", path)));
        }
    }

    #[tokio::test]
    async fn test_install_caches_exactly_the_app_shell() {
        let h = harness();
        serve_shell(&h.network);

        let report = h.worker.install().await.unwrap();
        assert_eq!(report.cache_name, "shoresquad-v1");

        let cache = h.storage.open("shoresquad-v1").await.unwrap();
        let mut keys: Vec<String> = cache.keys().await.into_iter().map(|k| k.url).collect();
        keys.sort();
        let mut expected: Vec<String> = SHELL.iter().map(|p| url(p).to_string()).collect();
        expected.sort();
        assert_eq!(keys, expected);

        assert_eq!(h.worker.state(), WorkerState::Installed);
        assert!(h.worker.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_install_is_atomic_when_one_asset_fails() {
        let h = harness();
        serve_shell(&h.network);
        h.network.fail(url("/js/app.js"));

        let err = h.worker.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::Install { ref url, .. } if url.ends_with("/js/app.js")));

        let cache = h.storage.open("shoresquad-v1").await.unwrap();
        assert!(cache.keys().await.is_empty());
        assert_eq!(h.worker.state(), WorkerState::Redundant);
        assert!(!h.worker.skip_waiting_requested());

        // A redundant worker never activates
        assert!(matches!(
            h.worker.activate().await,
            Err(WorkerError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let h = harness();
        serve_shell(&h.network);
        h.network.respond(
            url("/manifest.json"),
            Response::new(&url("/manifest.json"), 404, ResponseType::Basic, "missing"),
        );

        let err = h.worker.install().await.unwrap_err();
        match err {
            WorkerError::Install {
                source: NetworkError::BadStatus { status, .. },
                ..
            } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.storage.open("shoresquad-v1").await.unwrap().keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_install_with_substitute_manifest_and_version() {
        let config = WorkerConfig {
            cache_version: "test-v9".into(),
            app_shell: vec!["/".into(), "/offline.html".into()],
            ..Default::default()
        };
        let h = harness_with(config, CacheStorage::in_memory());
        h.network.respond(url("/"), Response::basic(&url("/"), "home"));
        h.network.respond(url("/offline.html"), Response::basic(&url("/offline.html"), "offline"));

        let report = h.worker.install().await.unwrap();
        assert_eq!(report.cache_name, "test-v9");
        assert_eq!(report.cached.len(), 2);
        assert!(h.storage.has("test-v9").await);
        assert!(!h.storage.has("shoresquad-v1").await);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let h = harness();
        serve_shell(&h.network);
        h.worker.install().await.unwrap();
        assert!(matches!(
            h.worker.install().await,
            Err(WorkerError::InvalidState { operation: "install", .. })
        ));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let h = harness();
        let err = h.worker.activate().await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidState {
                operation: "activate",
                state: WorkerState::Parsed
            }
        ));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let storage = CacheStorage::in_memory();
        storage.open("shoresquad-v0").await.unwrap();
        storage.open("legacy-cache").await.unwrap();

        let h = harness_with(WorkerConfig::default(), storage);
        serve_shell(&h.network);
        h.worker.install().await.unwrap();

        let mut report = h.worker.activate().await.unwrap();
        report.deleted.sort();
        assert_eq!(report.deleted, vec!["legacy-cache".to_string(), "shoresquad-v0".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(h.storage.keys().await, vec!["shoresquad-v1".to_string()]);
        assert_eq!(h.worker.state(), WorkerState::Activated);
        assert_eq!(h.clients.claims(), 1);
    }

    #[tokio::test]
    async fn test_reactivation_is_a_noop() {
        let h = harness();
        serve_shell(&h.network);
        h.worker.install().await.unwrap();
        h.worker.activate().await.unwrap();

        let report = h.worker.activate().await.unwrap();
        assert_eq!(report, ActivationReport::default());
        assert_eq!(h.storage.keys().await, vec!["shoresquad-v1".to_string()]);
        assert_eq!(h.worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_version_bump_leaves_only_new_generation() {
        let storage = CacheStorage::in_memory();

        let v1 = harness_with(WorkerConfig::default(), storage.clone());
        serve_shell(&v1.network);
        v1.worker.install().await.unwrap();
        v1.worker.activate().await.unwrap();

        let v2_config = WorkerConfig {
            cache_version: "shoresquad-v2".into(),
            ..Default::default()
        };
        let v2 = harness_with(v2_config, storage.clone());
        serve_shell(&v2.network);
        v2.worker.install().await.unwrap();

        // Both generations coexist until the new version activates
        assert_eq!(storage.keys().await.len(), 2);

        v2.worker.activate().await.unwrap();
        assert_eq!(storage.keys().await, vec!["shoresquad-v2".to_string()]);
        assert!(!storage.has("shoresquad-v1").await);
    }

    #[tokio::test]
    async fn test_only_activation_changes_the_active_generation() {
        let storage = CacheStorage::in_memory();

        // A failed install leaves its generation behind but never takes over
        let broken = harness_with(WorkerConfig::default(), storage.clone());
        assert!(broken.worker.install().await.is_err());
        assert!(storage.has("shoresquad-v1").await);
        assert_eq!(storage.active().await, None);

        let v1 = harness_with(WorkerConfig::default(), storage.clone());
        serve_shell(&v1.network);
        v1.worker.install().await.unwrap();
        assert_eq!(storage.active().await, None);
        v1.worker.activate().await.unwrap();
        assert_eq!(storage.active().await.as_deref(), Some("shoresquad-v1"));

        // An installed but waiting version leaves the previous one serving
        let v2_config = WorkerConfig {
            cache_version: "shoresquad-v2".into(),
            ..Default::default()
        };
        let v2 = harness_with(v2_config, storage.clone());
        serve_shell(&v2.network);
        v2.worker.install().await.unwrap();
        assert_eq!(storage.active().await.as_deref(), Some("shoresquad-v1"));

        v2.worker.activate().await.unwrap();
        assert_eq!(storage.active().await.as_deref(), Some("shoresquad-v2"));
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::open_dir(dir.path()).await.unwrap();
        storage.open("old-a").await.unwrap();
        storage.open("old-b").await.unwrap();

        // A directory where the generation file should be makes removal fail
        let blocked = dir.path().join("old-a.json");
        std::fs::remove_file(&blocked).unwrap();
        std::fs::create_dir(&blocked).unwrap();

        let h = harness_with(WorkerConfig::default(), storage);
        serve_shell(&h.network);
        h.worker.install().await.unwrap();

        let report = h.worker.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["old-b".to_string()]);
        assert_eq!(report.failed, vec!["old-a".to_string()]);
        assert_eq!(h.worker.state(), WorkerState::Activated);
        assert!(!h.storage.has("old-b").await);
    }

    #[test]
    fn test_activation_report_skips_generations_already_gone() {
        let mut report = ActivationReport::default();
        report.record("old-a".into(), Ok(true));
        report.record("old-b".into(), Ok(false));
        report.record("old-c".into(), Err(CacheError::NotFound("old-c".into())));

        assert_eq!(report.deleted, vec!["old-a".to_string()]);
        assert_eq!(report.failed, vec!["old-c".to_string()]);
    }

    #[tokio::test]
    async fn test_non_get_requests_pass_through() {
        let h = harness();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let request = Request::new(method, url("/api/rsvp"));
            let outcome = h.worker.handle_fetch(&request).await.unwrap();
            assert_eq!(outcome, FetchOutcome::Passthrough);
        }
        assert_eq!(h.network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let h = harness();
        serve_shell(&h.network);
        h.worker.install().await.unwrap();
        let installs = h.network.calls();

        let outcome = h
            .worker
            .handle_fetch(&Request::get(url("/css/styles.css")))
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::Cache(ref r) if r.body == b"shell /css/styles.css"));
        assert_eq!(h.network.calls(), installs);
    }

    #[tokio::test]
    async fn test_cache_miss_returns_network_and_populates() {
        let h = harness();
        let target = url("/images/beach.png");
        h.network.respond(target.clone(), Response::basic(&target, "png"));

        let outcome = h.worker.handle_fetch(&Request::get(target.clone())).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Network(ref r) if r.body == b"png"));

        h.worker.wait_for_background().await;
        let stored = h
            .storage
            .match_entry("shoresquad-v1", &RequestKey::get(&target))
            .await;
        assert_eq!(stored.map(|r| r.body), Some(b"png".to_vec()));

        // Second request is served from cache
        let again = h.worker.handle_fetch(&Request::get(target)).await.unwrap();
        assert_eq!(again.source(), "cache");
        assert_eq!(h.network.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_completes_without_caller_waiting() {
        let h = harness();
        let target = url("/js/map.js");
        h.network.respond(target.clone(), Response::basic(&target, "map"));

        h.worker.handle_fetch(&Request::get(target.clone())).await.unwrap();

        // Poll instead of joining: the write lands on its own
        let key = RequestKey::get(&target);
        let mut stored = false;
        for _ in 0..100 {
            if h.storage.match_entry("shoresquad-v1", &key).await.is_some() {
                stored = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(stored);
    }

    #[tokio::test]
    async fn test_fetch_is_not_blocked_while_waiting_for_background() {
        let h = harness();
        let target = url("/images/tide.png");
        h.network.respond(target.clone(), Response::basic(&target, "tide"));

        // A store that stays pending until released
        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        h.worker.background.lock().await.spawn(async move {
            let _ = gate.await;
        });

        let waiter = h.worker.wait_for_background();
        tokio::pin!(waiter);
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut waiter)
            .await
            .is_err());

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            h.worker.handle_fetch(&Request::get(target.clone())),
        )
        .await
        .expect("fetch stalled behind wait_for_background")
        .unwrap();
        assert_eq!(outcome.source(), "network");

        release.send(()).unwrap();
        waiter.await;

        h.worker.wait_for_background().await;
        assert!(h
            .storage
            .match_entry("shoresquad-v1", &RequestKey::get(&target))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_uncacheable_responses_are_not_stored() {
        let h = harness();
        let not_found = url("/missing.html");
        let opaque = Url::parse("https://tile.openstreetmap.org/1/1/1.png").unwrap();
        let cors_error = Url::parse("https://api.open-meteo.com/v1/forecast").unwrap();
        h.network.respond(
            not_found.clone(),
            Response::new(&not_found, 404, ResponseType::Basic, "nope"),
        );
        h.network.respond(opaque.clone(), Response::opaque(&opaque));
        h.network.respond(
            cors_error.clone(),
            Response::new(&cors_error, 500, ResponseType::Cors, "down"),
        );

        for target in [&not_found, &opaque, &cors_error] {
            let outcome = h.worker.handle_fetch(&Request::get(target.clone())).await.unwrap();
            assert_eq!(outcome.source(), "network");
        }

        h.worker.wait_for_background().await;
        assert!(!h.storage.has("shoresquad-v1").await);
    }

    #[tokio::test]
    async fn test_cors_200_is_stored() {
        let h = harness();
        let weather = Url::parse("https://api.open-meteo.com/v1/forecast?latitude=1.3").unwrap();
        h.network.respond(
            weather.clone(),
            Response::new(&weather, 200, ResponseType::Cors, "{}"),
        );

        h.worker.handle_fetch(&Request::get(weather.clone())).await.unwrap();
        h.worker.wait_for_background().await;
        assert!(h
            .storage
            .match_entry("shoresquad-v1", &RequestKey::get(&weather))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_offline_without_root_fails() {
        let h = harness();
        let target = url("/events.json");
        h.network.fail(target.clone());

        let err = h.worker.handle_fetch(&Request::get(target)).await.unwrap_err();
        assert!(matches!(err, WorkerError::Offline { ref url, .. } if url.ends_with("/events.json")));
    }

    #[tokio::test]
    async fn test_offline_with_root_serves_root_document() {
        let h = harness();
        serve_shell(&h.network);
        h.worker.install().await.unwrap();

        // Even a failed image request gets the root HTML
        let image = url("/images/crew.png");
        h.network.fail(image.clone());
        let outcome = h.worker.handle_fetch(&Request::get(image)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Fallback(ref r) if r.body == b"shell /"));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_affect_response() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("caches");
        let storage = CacheStorage::open_dir(&cache_dir).await.unwrap();
        let h = harness_with(WorkerConfig::default(), storage);
        let target = url("/js/app.js");
        h.network.respond(target.clone(), Response::basic(&target, "app"));

        // Every write now fails
        std::fs::remove_dir_all(&cache_dir).unwrap();

        let outcome = h.worker.handle_fetch(&Request::get(target)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Network(ref r) if r.body == b"app"));
        h.worker.wait_for_background().await;
        assert!(!h.storage.has("shoresquad-v1").await);
    }

    #[tokio::test]
    async fn test_push_uses_payload_body() {
        let h = harness();
        let shown = h
            .worker
            .handle_push(Some(br#"{"body":"Cleanup starts in 1 hour!"}"#))
            .await
            .unwrap();
        assert_eq!(shown.body, "Cleanup starts in 1 hour!");
        assert_eq!(h.notifier.shown()[0].body, "Cleanup starts in 1 hour!");
    }

    #[tokio::test]
    async fn test_push_without_payload_uses_default_body() {
        let h = harness();
        let shown = h.worker.handle_push(None).await.unwrap();
        assert_eq!(shown.body, "New beach cleanup event near you!");
        assert_eq!(shown.title, "ShoreSquad");

        let garbled = h.worker.handle_push(Some(b"\xff\xfe")).await.unwrap();
        assert_eq!(garbled.body, "New beach cleanup event near you!");
        assert_eq!(h.notifier.shown().len(), 2);
    }

    #[tokio::test]
    async fn test_click_focuses_existing_root_window() {
        let h = harness();
        h.clients.add(WindowClient {
            id: "tab-events".into(),
            url: url("/index.html"),
            focused: false,
        });
        h.clients.add(WindowClient {
            id: "tab-root".into(),
            url: url("/"),
            focused: false,
        });
        let notification = h.worker.handle_push(None).await.unwrap();

        let outcome = h.worker.handle_notification_click(&notification).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Focused("tab-root".into()));
        assert_eq!(h.notifier.closed(), vec![notification.tag.clone()]);
        assert_eq!(h.clients.focused(), vec!["tab-root".to_string()]);
        assert!(h.clients.opened().is_empty());
    }

    #[tokio::test]
    async fn test_click_opens_root_when_no_window_matches() {
        let h = harness();
        h.clients.add(WindowClient {
            id: "tab-events".into(),
            url: url("/index.html"),
            focused: true,
        });
        let notification = h.worker.handle_push(None).await.unwrap();

        let outcome = h.worker.handle_notification_click(&notification).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Opened);
        assert_eq!(h.clients.opened(), vec![url("/")]);
        assert!(h.clients.focused().is_empty());
    }

    #[tokio::test]
    async fn test_state_changes_are_observable() {
        let h = harness();
        serve_shell(&h.network);
        let rx = h.worker.subscribe();
        assert_eq!(*rx.borrow(), WorkerState::Parsed);

        h.worker.install().await.unwrap();
        assert_eq!(*rx.borrow(), WorkerState::Installed);
        h.worker.activate().await.unwrap();
        assert_eq!(*rx.borrow(), WorkerState::Activated);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = WorkerConfig {
            origin: "::nope::".into(),
            ..Default::default()
        };
        let result = ServiceWorker::new(
            config,
            CacheStorage::in_memory(),
            Arc::new(FakeNetwork::default()),
            Arc::new(RecordingNotifier::default()),
            Arc::new(FakeClients::default()),
        );
        assert!(matches!(
            result,
            Err(WorkerError::Config(ConfigError::InvalidOrigin { .. }))
        ));
    }
}
