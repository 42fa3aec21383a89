use std::{env, path::PathBuf};

use url::Url;

use crate::{DEFAULT_ORIGIN_URL, ORIGIN_URL_ENV, ROOT_DIR_ENV};

pub(crate) fn normalize_origin_url(raw: &str, default_origin_url: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default_origin_url.to_string();
    }

    match Url::parse(trimmed) {
        Ok(mut parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.set_fragment(None);
            parsed.set_query(None);
            if !parsed.path().ends_with('/') {
                let path = format!("{}/", parsed.path());
                parsed.set_path(&path);
            }
            parsed.to_string()
        }
        _ => default_origin_url.to_string(),
    }
}

pub(crate) fn resolve_origin_url() -> Url {
    let normalized = normalize_origin_url(
        &env::var(ORIGIN_URL_ENV).unwrap_or_else(|_| DEFAULT_ORIGIN_URL.to_string()),
        DEFAULT_ORIGIN_URL,
    );
    Url::parse(&normalized).unwrap_or_else(|_| default_origin_url())
}

fn default_origin_url() -> Url {
    // DEFAULT_ORIGIN_URL is a literal http URL.
    Url::parse(DEFAULT_ORIGIN_URL).expect("default origin url is valid")
}

pub(crate) fn default_root_dir() -> Option<PathBuf> {
    if let Ok(root) = env::var(ROOT_DIR_ENV) {
        let path = PathBuf::from(root.trim());
        if !path.as_os_str().is_empty() {
            return Some(path);
        }
    }

    home::home_dir().map(|home| home.join(".gamehub"))
}

pub(crate) fn cache_root_dir(root_dir: Option<PathBuf>) -> PathBuf {
    root_dir
        .unwrap_or_else(env::temp_dir)
        .join("cache")
}
