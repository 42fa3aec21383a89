use std::sync::{atomic::AtomicBool, Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
    cache_store::{request_key, CacheError, CacheStorage},
    cache_strategy::CacheStrategy,
    network::{FetchError, Network, ResourceResponse},
    AtomicFlagGuard,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum InstallPhase {
    Uninstalled,
    Installing,
    Active,
}

#[derive(Debug, Error)]
pub(crate) enum InstallError {
    #[error("offline cache install already in progress")]
    InProgress,
    #[error("invalid precache entry '{path}': {reason}")]
    InvalidEntry { path: String, reason: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("precache fetch for {url} returned status {status}")]
    BadStatus { url: String, status: u16 },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub(crate) enum InterceptError {
    #[error("{source}; no cached response for {url}")]
    Unavailable {
        url: String,
        #[source]
        source: FetchError,
    },
}

impl InterceptError {
    fn unavailable(url: &Url, source: FetchError) -> Self {
        Self::Unavailable {
            url: request_key(url),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OfflineCacheConfig {
    pub(crate) cache_name: String,
    pub(crate) origin_url: Url,
    pub(crate) precache: Vec<String>,
    pub(crate) strategy: CacheStrategy,
}

/// Network interceptor backed by a single version-tagged cache store.
///
/// Until [`OfflineCache::install`] succeeds every request goes straight to
/// the network. Once active, requests are answered per the configured
/// [`CacheStrategy`].
pub(crate) struct OfflineCache {
    config: OfflineCacheConfig,
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    phase: Mutex<InstallPhase>,
    is_installing: AtomicBool,
    log: fn(&str),
}

impl OfflineCache {
    pub(crate) fn new(
        config: OfflineCacheConfig,
        network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
        log: fn(&str),
    ) -> Self {
        Self {
            config,
            network,
            storage,
            phase: Mutex::new(InstallPhase::Uninstalled),
            is_installing: AtomicBool::new(false),
            log,
        }
    }

    pub(crate) fn config(&self) -> &OfflineCacheConfig {
        &self.config
    }

    pub(crate) fn phase(&self) -> InstallPhase {
        self.phase
            .lock()
            .map(|guard| *guard)
            .unwrap_or(InstallPhase::Uninstalled)
    }

    fn set_phase(&self, phase: InstallPhase) {
        match self.phase.lock() {
            Ok(mut guard) => *guard = phase,
            Err(_) => (self.log)("offline cache phase lock poisoned"),
        }
    }

    pub(crate) fn precache_urls(&self) -> Result<Vec<Url>, InstallError> {
        self.config
            .precache
            .iter()
            .map(|path| {
                self.config
                    .origin_url
                    .join(path)
                    .map_err(|error| InstallError::InvalidEntry {
                        path: path.clone(),
                        reason: error.to_string(),
                    })
            })
            .collect()
    }

    /// Populates the store with every precache entry, all or nothing.
    ///
    /// A store that already holds every entry is activated without touching
    /// the network.
    pub(crate) async fn install(&self) -> Result<(), InstallError> {
        if self.phase() == InstallPhase::Active {
            return Ok(());
        }
        let Some(_installing) = AtomicFlagGuard::try_set(&self.is_installing) else {
            return Err(InstallError::InProgress);
        };

        self.set_phase(InstallPhase::Installing);
        let urls = match self.precache_urls() {
            Ok(urls) => urls,
            Err(error) => {
                self.set_phase(InstallPhase::Uninstalled);
                return Err(error);
            }
        };

        // A store completed by an earlier run serves offline starts as is.
        if self.holds_every_entry(&urls).await {
            self.set_phase(InstallPhase::Active);
            (self.log)(&format!(
                "offline cache {} resumed from persisted store",
                self.config.cache_name
            ));
            self.remove_stale_stores().await;
            return Ok(());
        }

        (self.log)(&format!(
            "installing offline cache {} from {}",
            self.config.cache_name, self.config.origin_url
        ));

        match self.populate(&urls).await {
            Ok(count) => {
                self.set_phase(InstallPhase::Active);
                (self.log)(&format!(
                    "offline cache {} active with {count} entries",
                    self.config.cache_name
                ));
                self.remove_stale_stores().await;
                Ok(())
            }
            Err(error) => {
                self.set_phase(InstallPhase::Uninstalled);
                (self.log)(&format!(
                    "offline cache {} install failed: {error}",
                    self.config.cache_name
                ));
                Err(error)
            }
        }
    }

    async fn holds_every_entry(&self, urls: &[Url]) -> bool {
        for url in urls {
            if self.cached(url).await.is_none() {
                return false;
            }
        }
        !urls.is_empty()
    }

    async fn populate(&self, urls: &[Url]) -> Result<usize, InstallError> {
        self.storage.open(&self.config.cache_name).await?;

        let mut responses = Vec::with_capacity(urls.len());
        for url in urls {
            let response = self.network.fetch(url).await?;
            if !response.is_ok() {
                return Err(InstallError::BadStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            responses.push(ResourceResponse {
                url: request_key(url),
                ..response
            });
        }

        let count = responses.len();
        self.storage
            .put_all(&self.config.cache_name, responses)
            .await?;
        Ok(count)
    }

    async fn remove_stale_stores(&self) {
        let names = match self.storage.store_names().await {
            Ok(names) => names,
            Err(error) => {
                (self.log)(&format!("failed to list cache stores: {error}"));
                return;
            }
        };

        for name in names
            .into_iter()
            .filter(|name| name != &self.config.cache_name)
        {
            match self.storage.delete_store(&name).await {
                Ok(true) => (self.log)(&format!("removed superseded cache store {name}")),
                Ok(false) => {}
                Err(error) => (self.log)(&format!(
                    "failed to remove superseded cache store {name}: {error}"
                )),
            }
        }
    }

    pub(crate) async fn intercept(&self, url: &Url) -> Result<ResourceResponse, InterceptError> {
        if self.phase() != InstallPhase::Active {
            return self
                .network
                .fetch(url)
                .await
                .map_err(|error| InterceptError::unavailable(url, error));
        }

        match self.config.strategy {
            CacheStrategy::NetworkFirst => match self.network.fetch(url).await {
                Ok(response) => Ok(response),
                Err(error) => self
                    .cached(url)
                    .await
                    .ok_or_else(|| InterceptError::unavailable(url, error)),
            },
            CacheStrategy::CacheFirst => {
                if let Some(cached) = self.cached(url).await {
                    return Ok(cached);
                }
                self.network
                    .fetch(url)
                    .await
                    .map_err(|error| InterceptError::unavailable(url, error))
            }
            CacheStrategy::StaleWhileRevalidate => {
                if let Some(cached) = self.cached(url).await {
                    self.spawn_revalidate(url.clone());
                    return Ok(cached);
                }
                let response = self
                    .network
                    .fetch(url)
                    .await
                    .map_err(|error| InterceptError::unavailable(url, error))?;
                if response.is_ok() {
                    self.store_response(url, response.clone()).await;
                }
                Ok(response)
            }
        }
    }

    async fn cached(&self, url: &Url) -> Option<ResourceResponse> {
        match self
            .storage
            .lookup(&self.config.cache_name, &request_key(url))
            .await
        {
            Ok(found) => found,
            Err(error) => {
                (self.log)(&format!("cache lookup for {url} failed: {error}"));
                None
            }
        }
    }

    async fn store_response(&self, url: &Url, response: ResourceResponse) {
        let entry = ResourceResponse {
            url: request_key(url),
            ..response
        };
        if let Err(error) = self
            .storage
            .put_all(&self.config.cache_name, vec![entry])
            .await
        {
            (self.log)(&format!("failed to store {url} in offline cache: {error}"));
        }
    }

    fn spawn_revalidate(&self, url: Url) {
        let network = Arc::clone(&self.network);
        let storage = Arc::clone(&self.storage);
        let cache_name = self.config.cache_name.clone();
        let log = self.log;
        tauri::async_runtime::spawn(async move {
            refresh_entry(network.as_ref(), storage.as_ref(), &cache_name, &url, log).await;
        });
    }
}

/// Refetches `url` and overwrites its cache entry when the response is ok.
pub(crate) async fn refresh_entry(
    network: &dyn Network,
    storage: &dyn CacheStorage,
    cache_name: &str,
    url: &Url,
    log: fn(&str),
) -> bool {
    let response = match network.fetch(url).await {
        Ok(response) if response.is_ok() => response,
        Ok(response) => {
            log(&format!(
                "revalidate {url} skipped: status {}",
                response.status
            ));
            return false;
        }
        Err(error) => {
            log(&format!("revalidate {url} failed: {error}"));
            return false;
        }
    };

    let entry = ResourceResponse {
        url: request_key(url),
        ..response
    };
    match storage.put_all(cache_name, vec![entry]).await {
        Ok(()) => true,
        Err(error) => {
            log(&format!("revalidate {url} could not store response: {error}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::cache_store::{memory::MemoryCacheStorage, DiskCacheStorage};

    const ORIGIN: &str = "http://127.0.0.1:8080/";
    const CACHE_NAME: &str = "hub-hyo-v1";

    #[derive(Default)]
    struct FakeNetwork {
        pages: Mutex<HashMap<String, Vec<u8>>>,
        offline: AtomicBool,
        fetches: AtomicUsize,
    }

    impl FakeNetwork {
        fn with_pages(pages: &[(&str, &[u8])]) -> Self {
            let network = Self::default();
            for (url, body) in pages {
                network.set_page(url, body);
            }
            network
        }

        fn set_page(&self, url: &str, body: &[u8]) {
            self.pages
                .lock()
                .expect("fake network lock")
                .insert(url.to_string(), body.to_vec());
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, url: &Url) -> Result<ResourceResponse, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::new(url, "network unreachable"));
            }
            let pages = self.pages.lock().expect("fake network lock");
            Ok(match pages.get(url.as_str()) {
                Some(body) => ResourceResponse {
                    url: url.to_string(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: body.clone(),
                },
                None => ResourceResponse {
                    url: url.to_string(),
                    status: 404,
                    content_type: None,
                    body: Vec::new(),
                },
            })
        }
    }

    fn hub_pages() -> FakeNetwork {
        FakeNetwork::with_pages(&[
            ("http://127.0.0.1:8080/", b"<html>hub v1</html>"),
            ("http://127.0.0.1:8080/index.html", b"<html>hub v1</html>"),
            ("http://127.0.0.1:8080/logo.png", b"png-bytes"),
        ])
    }

    fn offline_cache(
        network: Arc<FakeNetwork>,
        storage: Arc<dyn CacheStorage>,
        strategy: CacheStrategy,
    ) -> OfflineCache {
        OfflineCache::new(
            OfflineCacheConfig {
                cache_name: CACHE_NAME.to_string(),
                origin_url: Url::parse(ORIGIN).expect("valid origin"),
                precache: vec!["./".to_string(), "./index.html".to_string()],
                strategy,
            },
            network,
            storage,
            |_| {},
        )
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN)
            .and_then(|origin| origin.join(path))
            .expect("valid url")
    }

    #[tokio::test]
    async fn fresh_install_serves_network_and_populates_cache() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage.clone(), CacheStrategy::NetworkFirst);
        assert_eq!(cache.phase(), InstallPhase::Uninstalled);

        cache.install().await.expect("install succeeds");
        assert_eq!(cache.phase(), InstallPhase::Active);
        assert_eq!(
            storage.entry_keys(CACHE_NAME),
            vec![
                "http://127.0.0.1:8080/".to_string(),
                "http://127.0.0.1:8080/index.html".to_string(),
            ]
        );

        network.set_page("http://127.0.0.1:8080/", b"<html>hub live</html>");
        let response = cache.intercept(&url("./")).await.expect("network response");
        assert_eq!(response.body, b"<html>hub live</html>");
    }

    #[tokio::test]
    async fn network_success_never_consults_cache() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network, storage.clone(), CacheStrategy::NetworkFirst);
        cache.install().await.expect("install succeeds");
        let lookups = storage.lookup_count();

        let response = cache
            .intercept(&url("missing.css"))
            .await
            .expect("404 is still a network response");
        assert_eq!(response.status, 404);
        assert_eq!(storage.lookup_count(), lookups);
    }

    #[tokio::test]
    async fn offline_request_returns_cached_bytes() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage, CacheStrategy::NetworkFirst);
        cache.install().await.expect("install succeeds");

        network.set_offline(true);
        let response = cache
            .intercept(&url("./#top"))
            .await
            .expect("cached response");
        assert_eq!(response.body, b"<html>hub v1</html>");
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn offline_request_for_unlisted_asset_fails() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage, CacheStrategy::NetworkFirst);
        cache.install().await.expect("install succeeds");

        network.set_offline(true);
        let error = cache
            .intercept(&url("logo.png"))
            .await
            .expect_err("asset was never cached");
        let InterceptError::Unavailable { url: failed, .. } = error;
        assert_eq!(failed, "http://127.0.0.1:8080/logo.png");
    }

    #[tokio::test]
    async fn install_fails_as_a_whole_when_one_entry_is_missing() {
        let network = Arc::new(FakeNetwork::with_pages(&[(
            "http://127.0.0.1:8080/",
            b"<html>hub v1</html>",
        )]));
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network, storage.clone(), CacheStrategy::NetworkFirst);

        let error = cache.install().await.expect_err("index.html is missing");
        assert!(matches!(error, InstallError::BadStatus { status: 404, .. }));
        assert_eq!(cache.phase(), InstallPhase::Uninstalled);
        assert!(storage.entry_keys(CACHE_NAME).is_empty());
    }

    #[tokio::test]
    async fn install_fails_offline_and_succeeds_on_retry() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage.clone(), CacheStrategy::NetworkFirst);

        network.set_offline(true);
        assert!(matches!(
            cache.install().await,
            Err(InstallError::Fetch(_))
        ));
        assert_eq!(cache.phase(), InstallPhase::Uninstalled);
        assert!(storage.entry_keys(CACHE_NAME).is_empty());

        network.set_offline(false);
        cache.install().await.expect("retry succeeds");
        assert_eq!(cache.phase(), InstallPhase::Active);
        assert_eq!(storage.entry_keys(CACHE_NAME).len(), 2);
    }

    #[tokio::test]
    async fn install_while_active_does_not_refetch() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage, CacheStrategy::NetworkFirst);

        cache.install().await.expect("install succeeds");
        let fetches = network.fetch_count();
        cache.install().await.expect("second install is a no-op");
        assert_eq!(network.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn install_rejects_concurrent_attempt() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage, CacheStrategy::NetworkFirst);

        let _held = AtomicFlagGuard::try_set(&cache.is_installing).expect("flag starts clear");
        assert!(matches!(
            cache.install().await,
            Err(InstallError::InProgress)
        ));
        assert_eq!(network.fetch_count(), 0);
    }

    #[tokio::test]
    async fn disk_store_serves_offline_start_after_restart() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let network = Arc::new(hub_pages());
        let first_run = offline_cache(
            network.clone(),
            Arc::new(DiskCacheStorage::new(dir.path())),
            CacheStrategy::NetworkFirst,
        );
        first_run.install().await.expect("online install succeeds");
        drop(first_run);

        network.set_offline(true);
        let fetches = network.fetch_count();
        let restarted = offline_cache(
            network.clone(),
            Arc::new(DiskCacheStorage::new(dir.path())),
            CacheStrategy::NetworkFirst,
        );
        assert_eq!(restarted.phase(), InstallPhase::Uninstalled);
        restarted
            .install()
            .await
            .expect("persisted store activates offline");
        assert_eq!(restarted.phase(), InstallPhase::Active);
        assert_eq!(network.fetch_count(), fetches);

        let response = restarted
            .intercept(&url("./"))
            .await
            .expect("cached response after restart");
        assert_eq!(response.body, b"<html>hub v1</html>");
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn partial_persisted_store_still_requires_network_install() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        storage.seed(
            CACHE_NAME,
            ResourceResponse {
                url: "http://127.0.0.1:8080/".to_string(),
                status: 200,
                content_type: None,
                body: b"<html>hub v0</html>".to_vec(),
            },
        );
        let cache = offline_cache(network.clone(), storage, CacheStrategy::NetworkFirst);

        network.set_offline(true);
        assert!(matches!(
            cache.install().await,
            Err(InstallError::Fetch(_))
        ));
        assert_eq!(cache.phase(), InstallPhase::Uninstalled);
    }

    #[tokio::test]
    async fn failed_install_persists_nothing_on_disk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let network = Arc::new(FakeNetwork::with_pages(&[(
            "http://127.0.0.1:8080/",
            b"<html>hub v1</html>",
        )]));
        let cache = offline_cache(
            network,
            Arc::new(DiskCacheStorage::new(dir.path())),
            CacheStrategy::NetworkFirst,
        );

        let error = cache.install().await.expect_err("index.html is missing");
        assert!(matches!(error, InstallError::BadStatus { status: 404, .. }));

        let reopened = DiskCacheStorage::new(dir.path());
        for path in ["./", "./index.html"] {
            assert!(reopened
                .lookup(CACHE_NAME, &request_key(&url(path)))
                .await
                .expect("lookup succeeds")
                .is_none());
        }
        let body_files = std::fs::read_dir(dir.path().join(CACHE_NAME))
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0);
        assert_eq!(body_files, 0);
    }

    #[tokio::test]
    async fn inactive_cache_passes_requests_through_without_fallback() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        storage.seed(
            CACHE_NAME,
            ResourceResponse {
                url: "http://127.0.0.1:8080/".to_string(),
                status: 200,
                content_type: None,
                body: b"stale".to_vec(),
            },
        );
        let cache = offline_cache(network.clone(), storage.clone(), CacheStrategy::NetworkFirst);

        network.set_offline(true);
        assert!(cache.intercept(&url("./")).await.is_err());
        assert_eq!(storage.lookup_count(), 0);
    }

    #[tokio::test]
    async fn activation_removes_superseded_stores() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        storage.seed(
            "hub-hyo-v0",
            ResourceResponse {
                url: "http://127.0.0.1:8080/".to_string(),
                status: 200,
                content_type: None,
                body: b"old".to_vec(),
            },
        );
        let cache = offline_cache(network, storage.clone(), CacheStrategy::NetworkFirst);

        cache.install().await.expect("install succeeds");
        assert_eq!(
            storage.store_names().await.expect("list stores"),
            vec![CACHE_NAME.to_string()]
        );
    }

    #[tokio::test]
    async fn cache_first_serves_hit_without_network() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network.clone(), storage, CacheStrategy::CacheFirst);
        cache.install().await.expect("install succeeds");

        let fetches = network.fetch_count();
        let response = cache.intercept(&url("index.html")).await.expect("cache hit");
        assert_eq!(response.body, b"<html>hub v1</html>");
        assert_eq!(network.fetch_count(), fetches);

        let response = cache.intercept(&url("logo.png")).await.expect("network miss");
        assert_eq!(response.body, b"png-bytes");
        assert_eq!(network.fetch_count(), fetches + 1);
    }

    #[tokio::test]
    async fn stale_while_revalidate_stores_network_miss() {
        let network = Arc::new(hub_pages());
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = offline_cache(network, storage.clone(), CacheStrategy::StaleWhileRevalidate);
        cache.install().await.expect("install succeeds");

        let response = cache.intercept(&url("logo.png")).await.expect("network miss");
        assert_eq!(response.body, b"png-bytes");
        assert!(storage
            .entry_keys(CACHE_NAME)
            .contains(&"http://127.0.0.1:8080/logo.png".to_string()));
    }

    #[tokio::test]
    async fn refresh_entry_overwrites_only_ok_responses() {
        let network = hub_pages();
        let storage = MemoryCacheStorage::default();
        storage.seed(
            CACHE_NAME,
            ResourceResponse {
                url: "http://127.0.0.1:8080/".to_string(),
                status: 200,
                content_type: None,
                body: b"stale".to_vec(),
            },
        );

        assert!(refresh_entry(&network, &storage, CACHE_NAME, &url("./"), |_| {}).await);
        let refreshed = storage
            .lookup(CACHE_NAME, "http://127.0.0.1:8080/")
            .await
            .expect("lookup succeeds")
            .expect("entry exists");
        assert_eq!(refreshed.body, b"<html>hub v1</html>");

        assert!(!refresh_entry(&network, &storage, CACHE_NAME, &url("gone.js"), |_| {}).await);
        network.set_offline(true);
        assert!(!refresh_entry(&network, &storage, CACHE_NAME, &url("./"), |_| {}).await);
    }
}
