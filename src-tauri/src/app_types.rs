use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    cache_strategy::CacheStrategy,
    offline_cache::{InstallPhase, OfflineCache},
};

pub(crate) struct OfflineCacheState {
    pub(crate) cache: Arc<OfflineCache>,
}

impl OfflineCacheState {
    pub(crate) fn new(cache: OfflineCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    pub(crate) fn status(&self) -> OfflineCacheStatus {
        let config = self.cache.config();
        OfflineCacheStatus {
            phase: self.cache.phase(),
            cache_name: config.cache_name.clone(),
            strategy: config.strategy,
            origin_url: config.origin_url.to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfflineCacheStatus {
    pub(crate) phase: InstallPhase,
    pub(crate) cache_name: String,
    pub(crate) strategy: CacheStrategy,
    pub(crate) origin_url: String,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct DesktopBridgeResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}
