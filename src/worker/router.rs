//! The cache router
//!
//! Wraps a [`Network`] with two named cache stores and answers every request
//! with the strategy of its route class. Network failures never escape
//! [`CacheRouter::fetch`]: they turn into a cache hit or
//! [`FetchOutcome::Unavailable`].

use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::notification::{ClickOutcome, Notification, NotificationClick, NotificationDefaults};
use super::routes::{RouteClass, RouteTable, Strategy};
use super::state::WorkerState;
use crate::config::Config;
use crate::error::{ConfigError, Error, Result};
use crate::http::{Request, Response};
use crate::network::Network;
use crate::store::{CacheHandle, CacheStorage};

/// Everything the router needs from configuration
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub origin: Url,
    pub static_cache: String,
    pub api_cache: String,
    pub manifest: Vec<String>,
    pub assets_prefix: String,
    pub sync_tag: String,
    pub notifications: NotificationDefaults,
}

impl RouterSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            origin: config.origin_url()?,
            static_cache: config.static_cache_name(),
            api_cache: config.api_cache_name(),
            manifest: config.static_manifest.clone(),
            assets_prefix: config.assets_prefix.clone(),
            sync_tag: config.sync_tag.clone(),
            notifications: NotificationDefaults {
                app_name: config.app_name.clone(),
                icon: config.notification_icon.clone(),
                badge: config.notification_badge.clone(),
            },
        })
    }
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

/// Result of routing one request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Response {
        response: Response,
        source: ResponseSource,
    },
    /// Network failed and no cached copy exists
    Unavailable,
}

impl FetchOutcome {
    fn network(response: Response) -> Self {
        FetchOutcome::Response {
            response,
            source: ResponseSource::Network,
        }
    }

    fn cache(response: Response) -> Self {
        FetchOutcome::Response {
            response,
            source: ResponseSource::Cache,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Response { response, .. } => Some(response),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Response { source, .. } => Some(*source),
            FetchOutcome::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub store: String,
    pub cached: Vec<String>,
    /// Take over without waiting for older instances to finish
    pub skip_waiting: bool,
    /// Installed over an active router, which now serves the new shell
    pub activated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateOutcome {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    /// Take control of open pages without a reload
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub tag: String,
    pub matched: bool,
}

/// Offline cache router.
///
/// Holds one handle per owned store; the storage itself is shared and
/// injected at construction.
pub struct CacheRouter {
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    static_cache: CacheHandle,
    api_cache: CacheHandle,
    routes: RouteTable,
    settings: RouterSettings,
    state: RwLock<WorkerState>,
    /// Set while a precache is in flight
    installing: AtomicBool,
}

impl CacheRouter {
    pub fn new(
        network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
        settings: RouterSettings,
    ) -> Self {
        let static_cache = CacheHandle::new(storage.clone(), settings.static_cache.clone());
        let api_cache = CacheHandle::new(storage.clone(), settings.api_cache.clone());
        let routes = RouteTable::new(&settings.manifest, &settings.assets_prefix);

        Self {
            network,
            storage,
            static_cache,
            api_cache,
            routes,
            settings,
            state: RwLock::new(WorkerState::Uninstalled),
            installing: AtomicBool::new(false),
        }
    }

    /// Resume from a previously persisted lifecycle state
    pub fn with_state(mut self, state: WorkerState) -> Self {
        self.state = RwLock::new(state);
        self
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Resolve a path or URL against the origin
    pub fn resolve(&self, target: &str) -> Result<Url> {
        self.settings.origin.join(target).map_err(|e| {
            Error::Config(ConfigError::Invalid(format!(
                "cannot resolve '{}': {}",
                target, e
            )))
        })
    }

    /// Route class of a request. Only same-origin requests can be static or API.
    pub fn classify(&self, request: &Request) -> RouteClass {
        if request.url.origin() != self.settings.origin.origin() {
            return RouteClass::Default;
        }
        self.routes.classify(request.path())
    }

    // ------------------------------------------------------------------
    // Install
    // ------------------------------------------------------------------

    /// Precache the app shell into the static store.
    ///
    /// Nothing is written unless every manifest entry fetched with a 2xx. An
    /// active router keeps controlling fetches throughout; on success it
    /// skips waiting and cleans up stale stores as an activation would.
    pub async fn install(&self) -> Result<InstallOutcome> {
        let during = {
            let mut state = self.state.write().await;
            let next = state.begin_install()?;
            if self.installing.swap(true, Ordering::AcqRel) {
                return Err(Error::InvalidTransition {
                    from: WorkerState::Installing.to_string(),
                    event: "install".to_string(),
                });
            }
            *state = next;
            next
        };
        log::info!("Installing, precaching into {}", self.static_cache.name());

        let result = self.precache().await;
        let state = during.finish_install(result.is_ok());
        *self.state.write().await = state;
        self.installing.store(false, Ordering::Release);

        match result {
            Ok(cached) => {
                let activated = state.controls_fetches();
                if activated {
                    let (_, deleted) = self.delete_stale_stores()?;
                    log::info!(
                        "Already active; new shell in use ({} stale caches deleted)",
                        deleted.len()
                    );
                }
                Ok(InstallOutcome {
                    store: self.static_cache.name().to_string(),
                    cached,
                    skip_waiting: true,
                    activated,
                })
            }
            Err(e) => {
                log::warn!("Install failed, worker is {}: {}", state, e);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<Vec<String>> {
        self.static_cache.open()?;

        let requests = self
            .settings
            .manifest
            .iter()
            .map(|path| self.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>>>()?;

        let fetched =
            futures::future::join_all(requests.iter().map(|r| self.network.fetch(r))).await;

        let mut responses = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(fetched) {
            let response = result.map_err(|e| Error::InstallFailed {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(Error::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            responses.push(response);
        }

        for (request, response) in requests.iter().zip(&responses) {
            self.static_cache.put(request, response)?;
        }

        Ok(requests.iter().map(|r| r.url.to_string()).collect())
    }

    // ------------------------------------------------------------------
    // Activate
    // ------------------------------------------------------------------

    /// Delete every store that belongs to neither current name.
    pub async fn activate(&self) -> Result<ActivateOutcome> {
        let mut state = self.state.write().await;
        let next = state.begin_activate()?;

        let (kept, deleted) = self.delete_stale_stores()?;

        *state = next;
        log::info!("Activated; controlling clients");

        Ok(ActivateOutcome {
            kept,
            deleted,
            clients_claimed: true,
        })
    }

    /// Returns `(kept, deleted)` store names
    fn delete_stale_stores(&self) -> Result<(Vec<String>, Vec<String>)> {
        let current = [self.static_cache.name(), self.api_cache.name()];
        let mut kept = Vec::new();
        let mut deleted = Vec::new();

        for name in self.storage.store_names()? {
            if current.contains(&name.as_str()) {
                kept.push(name);
            } else if self.storage.delete_store(&name)? {
                log::info!("Deleted stale cache {}", name);
                deleted.push(name);
            }
        }

        Ok((kept, deleted))
    }

    // ------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------

    /// Answer one request.
    pub async fn fetch(&self, request: &Request) -> FetchOutcome {
        let state = self.state().await;
        if !state.controls_fetches() {
            log::debug!("Not controlling ({}), passing through {}", state, request.url);
            return self.passthrough(request).await;
        }

        let class = self.classify(request);
        log::debug!("{} {} -> {}", request.method, request.url, class);

        match class.strategy() {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirstWithWriteBack => self.network_first_with_write_back(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    async fn passthrough(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::network(response),
            Err(e) => {
                log::debug!("Network failed for {}: {}", request.url, e);
                FetchOutcome::Unavailable
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> FetchOutcome {
        if let hit @ FetchOutcome::Response { .. } = self.lookup(&self.static_cache, request) {
            log::debug!("Cache hit: {}", request.url);
            return hit;
        }
        self.passthrough(request).await
    }

    async fn network_first_with_write_back(&self, request: &Request) -> FetchOutcome {
        if let Err(e) = self.api_cache.open() {
            log::warn!("Failed to open {}: {}", self.api_cache.name(), e);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if request.is_get() && response.is_ok() {
                    let copy = response.duplicate();
                    if let Err(e) = self.api_cache.put(request, &copy) {
                        log::warn!("Failed to cache {}: {}", request.url, e);
                    }
                }
                FetchOutcome::network(response)
            }
            Err(e) => {
                log::debug!("Network failed for {}: {}, trying cache", request.url, e);
                self.lookup(&self.api_cache, request)
            }
        }
    }

    async fn network_first(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::network(response),
            Err(e) => {
                log::debug!("Network failed for {}: {}, trying all caches", request.url, e);
                match self.storage.match_any(&request.key()) {
                    Ok(Some(response)) => FetchOutcome::cache(response),
                    Ok(None) => FetchOutcome::Unavailable,
                    Err(e) => {
                        log::warn!("Cache lookup failed for {}: {}", request.url, e);
                        FetchOutcome::Unavailable
                    }
                }
            }
        }
    }

    fn lookup(&self, cache: &CacheHandle, request: &Request) -> FetchOutcome {
        match cache.match_request(request) {
            Ok(Some(response)) => FetchOutcome::cache(response),
            Ok(None) => FetchOutcome::Unavailable,
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", request.url, e);
                FetchOutcome::Unavailable
            }
        }
    }

    // ------------------------------------------------------------------
    // Auxiliary events
    // ------------------------------------------------------------------

    /// Background sync. The recognised tag is a placeholder with no work yet.
    pub fn sync(&self, tag: &str) -> SyncOutcome {
        let matched = tag == self.settings.sync_tag;
        if matched {
            log::info!("Background sync '{}' triggered", tag);
        } else {
            log::debug!("Ignoring background sync '{}'", tag);
        }
        SyncOutcome {
            tag: tag.to_string(),
            matched,
        }
    }

    /// Inbound push message. `None` means nothing is shown.
    pub fn push(&self, payload: Option<&[u8]>) -> Option<Notification> {
        let notification = Notification::from_push(payload, &self.settings.notifications);
        if let Some(ref n) = notification {
            log::info!("Showing notification '{}'", n.title);
        }
        notification
    }

    pub fn notification_click(&self, click: &NotificationClick) -> ClickOutcome {
        click.resolve(&self.settings.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MockNetwork;
    use crate::store::MemoryCacheStorage;
    use reqwest::Method;
    use serde_json::json;

    const ORIGIN: &str = "http://localhost:5173";

    fn url(path: &str) -> String {
        format!("{}{}", ORIGIN, path)
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse(&url(path)).unwrap())
    }

    fn settings() -> RouterSettings {
        RouterSettings::from_config(&Config::default()).unwrap()
    }

    async fn shell_network() -> MockNetwork {
        let mut network = MockNetwork::new();
        for path in Config::default().static_manifest {
            network = network
                .with_response(&url(&path), Response::new(200, format!("shell {}", path)))
                .await;
        }
        network
    }

    fn router_in(
        network: &MockNetwork,
        storage: &Arc<MemoryCacheStorage>,
        state: WorkerState,
    ) -> CacheRouter {
        CacheRouter::new(Arc::new(network.clone()), storage.clone(), settings()).with_state(state)
    }

    fn active_router(network: &MockNetwork) -> (CacheRouter, Arc<MemoryCacheStorage>) {
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(network, &storage, WorkerState::Active);
        (router, storage)
    }

    // --- API class ---------------------------------------------------------

    #[tokio::test]
    async fn test_api_get_200_is_cached_byte_identical() {
        let body = br#"[{"id":1,"title":"Street fair"}]"#.to_vec();
        let network = MockNetwork::new()
            .with_response(&url("/api/events"), Response::new(200, body.clone()))
            .await;
        let (router, storage) = active_router(&network);

        let request = get("/api/events");
        let outcome = router.fetch(&request).await;

        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        let returned = outcome.response().unwrap();
        assert_eq!(returned.body, body);

        let cached = storage
            .get("nearly-api-v1", &request.key())
            .unwrap()
            .unwrap();
        assert_eq!(&cached, returned);
    }

    #[tokio::test]
    async fn test_api_non_200_is_never_cached() {
        let network = MockNetwork::new()
            .with_response(&url("/api/users/404"), Response::new(404, "missing"))
            .await
            .with_response(&url("/api/news"), Response::new(500, "boom"))
            .await
            .with_response(&url("/api/polls"), Response::new(201, "created"))
            .await;
        let (router, storage) = active_router(&network);

        for path in ["/api/users/404", "/api/news", "/api/polls"] {
            let outcome = router.fetch(&get(path)).await;
            assert_eq!(outcome.source(), Some(ResponseSource::Network));
        }

        assert_eq!(storage.len("nearly-api-v1"), 0);
    }

    #[tokio::test]
    async fn test_api_mutating_request_is_never_cached() {
        let network = MockNetwork::new()
            .with_response(&url("/api/activities"), Response::new(200, "{}"))
            .await;
        let (router, storage) = active_router(&network);

        let request = Request::new(Method::POST, Url::parse(&url("/api/activities")).unwrap())
            .with_body(r#"{"text":"hi"}"#);
        let outcome = router.fetch(&request).await;

        assert_eq!(outcome.response().unwrap().status, 200);
        assert_eq!(storage.len("nearly-api-v1"), 0);

        let captured = network.captured_requests().await;
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].method, "POST");
    }

    #[tokio::test]
    async fn test_api_offline_returns_prior_response() {
        let network = MockNetwork::new()
            .with_response(&url("/api/news"), Response::new(200, "fresh news"))
            .await;
        let (router, _storage) = active_router(&network);

        router.fetch(&get("/api/news")).await;
        network.set_offline(true).await;

        let outcome = router.fetch(&get("/api/news")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"fresh news");
    }

    #[tokio::test]
    async fn test_api_offline_without_cache_is_unavailable() {
        let network = MockNetwork::new();
        network.set_offline(true).await;
        let (router, _storage) = active_router(&network);

        let outcome = router.fetch(&get("/api/users/1")).await;
        assert_eq!(outcome, FetchOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_api_fallback_is_keyed_by_exact_url() {
        let network = MockNetwork::new()
            .with_response(&url("/api/news?page=1"), Response::new(200, "page 1"))
            .await;
        let (router, _storage) = active_router(&network);

        router.fetch(&get("/api/news?page=1")).await;
        network.set_offline(true).await;

        let outcome = router.fetch(&get("/api/news?page=2")).await;
        assert_eq!(outcome, FetchOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_api_error_after_success_keeps_good_copy() {
        let network = MockNetwork::new()
            .with_response(&url("/api/polls/3"), Response::new(200, "good"))
            .await;
        let (router, _storage) = active_router(&network);

        router.fetch(&get("/api/polls/3")).await;
        network
            .set_response(&url("/api/polls/3"), Response::new(500, "error page"))
            .await;
        let outcome = router.fetch(&get("/api/polls/3")).await;
        assert_eq!(outcome.response().unwrap().status, 500);

        network.set_offline(true).await;
        let outcome = router.fetch(&get("/api/polls/3")).await;
        assert_eq!(outcome.response().unwrap().body, b"good");
    }

    // --- Static class ------------------------------------------------------

    #[tokio::test]
    async fn test_static_hit_skips_network() {
        let network = shell_network().await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        router.install().await.unwrap();
        router.activate().await.unwrap();
        let calls = network.call_count().await;

        let outcome = router.fetch(&get("/manifest.json")).await;

        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"shell /manifest.json");
        assert_eq!(network.call_count().await, calls);
    }

    #[tokio::test]
    async fn test_static_miss_goes_to_network_without_write_back() {
        let network = MockNetwork::new()
            .with_response(&url("/assets/app-1a2b.js"), Response::new(200, "js"))
            .await;
        let (router, storage) = active_router(&network);

        let outcome = router.fetch(&get("/assets/app-1a2b.js")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(storage.len("nearly-static-v1"), 0);

        router.fetch(&get("/assets/app-1a2b.js")).await;
        assert_eq!(network.calls_for(&url("/assets/app-1a2b.js")).await, 2);
    }

    // --- Default class -----------------------------------------------------

    #[tokio::test]
    async fn test_default_has_no_write_back() {
        let network = MockNetwork::new()
            .with_response(&url("/events"), Response::new(200, "page"))
            .await;
        let (router, storage) = active_router(&network);

        let outcome = router.fetch(&get("/events")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert!(storage.entries(None).unwrap().is_empty());

        network.set_offline(true).await;
        assert_eq!(router.fetch(&get("/events")).await, FetchOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_default_offline_matches_any_store() {
        let network = MockNetwork::new();
        network.set_offline(true).await;
        let (router, storage) = active_router(&network);

        let request = get("/profile");
        storage
            .put("nearly-static-v1", &request.key(), &Response::new(200, "profile"))
            .unwrap();

        let outcome = router.fetch(&request).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"profile");
    }

    #[tokio::test]
    async fn test_cross_origin_is_default() {
        let network = MockNetwork::new()
            .with_response("https://cdn.example.com/api/users", Response::new(200, "[]"))
            .await;
        let (router, storage) = active_router(&network);

        let request = Request::get(Url::parse("https://cdn.example.com/api/users").unwrap());
        assert_eq!(router.classify(&request), RouteClass::Default);

        router.fetch(&request).await;
        assert!(storage.entries(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uncontrolled_fetch_passes_through() {
        let network = MockNetwork::new()
            .with_response(&url("/api/news"), Response::new(200, "news"))
            .await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Installed);

        let outcome = router.fetch(&get("/api/news")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert!(storage.entries(None).unwrap().is_empty());
    }

    // --- Lifecycle ---------------------------------------------------------

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let network = shell_network().await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        let outcome = router.install().await.unwrap();

        assert!(outcome.skip_waiting);
        assert_eq!(outcome.cached.len(), 5);
        assert_eq!(storage.len("nearly-static-v1"), 5);
        assert_eq!(router.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_failure_caches_nothing() {
        let network = shell_network()
            .await
            .with_failure(&url("/icon-512.png"))
            .await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        let err = router.install().await.unwrap_err();

        assert!(matches!(err, Error::InstallFailed { .. }));
        assert_eq!(storage.len("nearly-static-v1"), 0);
        assert_eq!(router.state().await, WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let network = shell_network()
            .await
            .with_response(&url("/manifest.json"), Response::new(404, "nope"))
            .await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        let err = router.install().await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert_eq!(storage.len("nearly-static-v1"), 0);
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_active_router_in_control() {
        let network = shell_network()
            .await
            .with_response(&url("/api/news"), Response::new(200, "fresh news"))
            .await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        router.install().await.unwrap();
        router.activate().await.unwrap();
        router.fetch(&get("/api/news")).await;
        network.set_offline(true).await;

        let err = router.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { .. }));
        assert_eq!(router.state().await, WorkerState::Active);

        let outcome = router.fetch(&get("/api/news")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"fresh news");

        let outcome = router.fetch(&get("/index.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"shell /index.html");
    }

    #[tokio::test]
    async fn test_reinstall_while_active_serves_new_shell() {
        let network = shell_network().await;
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        let first = router.install().await.unwrap();
        assert!(!first.activated);
        router.activate().await.unwrap();

        storage.open("nearly-static-v0").unwrap();
        network
            .set_response(&url("/index.html"), Response::new(200, "shell v2"))
            .await;

        let second = router.install().await.unwrap();
        assert!(second.skip_waiting);
        assert!(second.activated);
        assert_eq!(router.state().await, WorkerState::Active);
        assert_eq!(storage.store_names().unwrap(), vec!["nearly-static-v1"]);

        let outcome = router.fetch(&get("/index.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"shell v2");
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_stores() {
        let network = MockNetwork::new();
        let storage = Arc::new(MemoryCacheStorage::new());
        let key = get("/api/news").key();

        storage.open("nearly-static-v0").unwrap();
        storage
            .put("nearly-api-v0", &key, &Response::new(200, "old"))
            .unwrap();
        storage.open("something-else").unwrap();
        storage.open("nearly-static-v1").unwrap();
        storage
            .put("nearly-api-v1", &key, &Response::new(200, "current"))
            .unwrap();

        let router = router_in(&network, &storage, WorkerState::Installed);
        let outcome = router.activate().await.unwrap();

        assert!(outcome.clients_claimed);
        assert_eq!(
            outcome.deleted,
            vec!["nearly-static-v0", "nearly-api-v0", "something-else"]
        );
        assert_eq!(
            storage.store_names().unwrap(),
            vec!["nearly-static-v1", "nearly-api-v1"]
        );
        assert_eq!(
            storage.get("nearly-api-v1", &key).unwrap().unwrap().body,
            b"current"
        );
        assert_eq!(router.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let network = MockNetwork::new();
        let storage = Arc::new(MemoryCacheStorage::new());
        let router = router_in(&network, &storage, WorkerState::Uninstalled);

        let err = router.activate().await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(router.state().await, WorkerState::Uninstalled);
    }

    // --- Auxiliary events --------------------------------------------------

    #[tokio::test]
    async fn test_sync_matches_configured_tag() {
        let (router, _storage) = active_router(&MockNetwork::new());

        assert!(router.sync("sync-posts").matched);
        assert!(!router.sync("sync-other").matched);
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let (router, _storage) = active_router(&MockNetwork::new());

        let n = router
            .push(Some(br#"{"title":"Nearly","body":"Test"}"#.as_slice()))
            .unwrap();
        assert_eq!(n.title, "Nearly");
        assert_eq!(n.body, "Test");
        assert!(n.actions.is_empty());

        assert!(router.push(Some(b"{oops".as_slice())).is_none());

        let view = NotificationClick {
            action: Some("view".to_string()),
            data: json!({"url": "/events"}),
        };
        assert_eq!(
            router.notification_click(&view),
            ClickOutcome::OpenOrFocus {
                url: url("/events")
            }
        );

        let dismiss = NotificationClick {
            action: Some("dismiss".to_string()),
            data: json!({"url": "/events"}),
        };
        assert_eq!(router.notification_click(&dismiss), ClickOutcome::Dismissed);
    }
}
