use std::{env, fmt};

use serde::Serialize;

use crate::CACHE_STRATEGY_ENV;

/// How an active offline cache answers an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum CacheStrategy {
    /// Network once, cached entry on fetch error. Never writes.
    #[default]
    NetworkFirst,
    /// Cached entry when present, otherwise network. Never writes.
    CacheFirst,
    /// Cached entry immediately, refreshed in the background.
    StaleWhileRevalidate,
}

impl CacheStrategy {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NetworkFirst => "network-first",
            Self::CacheFirst => "cache-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "network-first" => Some(Self::NetworkFirst),
            "cache-first" => Some(Self::CacheFirst),
            "stale-while-revalidate" | "swr" => Some(Self::StaleWhileRevalidate),
            _ => None,
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn resolve_cache_strategy<F>(log: F) -> CacheStrategy
where
    F: Fn(&str),
{
    let Ok(raw) = env::var(CACHE_STRATEGY_ENV) else {
        return CacheStrategy::default();
    };
    if raw.trim().is_empty() {
        return CacheStrategy::default();
    }

    CacheStrategy::parse(&raw).unwrap_or_else(|| {
        log(&format!(
            "unsupported {CACHE_STRATEGY_ENV} value '{raw}'; using {}",
            CacheStrategy::default()
        ));
        CacheStrategy::default()
    })
}
