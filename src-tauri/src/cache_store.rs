use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, sync::Mutex as AsyncMutex};
use url::Url;

use crate::network::ResourceResponse;

const INDEX_FILE: &str = "index.json";
const INDEX_TMP_FILE: &str = "index.json.tmp";

#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error("invalid cache store name '{0}'")]
    InvalidStoreName(String),
    #[error("cache store index {path} is corrupt: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },
    #[error("cache store io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Request identity used as the cache key: the absolute URL without fragment.
pub(crate) fn request_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

/// Named key-value stores mapping request identity to a stored response.
#[async_trait]
pub(crate) trait CacheStorage: Send + Sync {
    /// Creates the store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Stores every response or none of them.
    async fn put_all(&self, name: &str, responses: Vec<ResourceResponse>)
        -> Result<(), CacheError>;

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<ResourceResponse>, CacheError>;

    async fn store_names(&self) -> Result<Vec<String>, CacheError>;

    /// Returns whether a store was removed.
    async fn delete_store(&self, name: &str) -> Result<bool, CacheError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreIndex {
    next_body_id: u64,
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    url: String,
    status: u16,
    content_type: Option<String>,
    body_file: String,
    stored_at: String,
}

/// Cache stores persisted as `<root>/<name>/index.json` plus one body file per entry.
///
/// Index updates are read-modify-write, so every access to a store's files
/// holds that store's lock.
pub(crate) struct DiskCacheStorage {
    root: PathBuf,
    store_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DiskCacheStorage {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store_locks: Mutex::new(HashMap::new()),
        }
    }

    fn store_lock(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.store_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn store_dir(&self, name: &str) -> Result<PathBuf, CacheError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !valid {
            return Err(CacheError::InvalidStoreName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    async fn read_index(store_dir: &Path) -> Result<Option<StoreIndex>, CacheError> {
        let index_path = store_dir.join(INDEX_FILE);
        let raw = match fs::read_to_string(&index_path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(CacheError::io(&index_path, error)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| CacheError::CorruptIndex {
                path: index_path,
                reason: error.to_string(),
            })
    }

    async fn write_index(store_dir: &Path, index: &StoreIndex) -> Result<(), CacheError> {
        let index_path = store_dir.join(INDEX_FILE);
        let tmp_path = store_dir.join(INDEX_TMP_FILE);
        let serialized =
            serde_json::to_vec_pretty(index).map_err(|error| CacheError::CorruptIndex {
                path: index_path.clone(),
                reason: error.to_string(),
            })?;
        fs::write(&tmp_path, serialized)
            .await
            .map_err(|error| CacheError::io(&tmp_path, error))?;
        fs::rename(&tmp_path, &index_path)
            .await
            .map_err(|error| CacheError::io(&index_path, error))
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        let store_dir = self.store_dir(name)?;
        fs::create_dir_all(&store_dir)
            .await
            .map_err(|error| CacheError::io(&store_dir, error))
    }

    async fn put_all(
        &self,
        name: &str,
        responses: Vec<ResourceResponse>,
    ) -> Result<(), CacheError> {
        let store_dir = self.store_dir(name)?;
        let lock = self.store_lock(name);
        let _guard = lock.lock().await;
        fs::create_dir_all(&store_dir)
            .await
            .map_err(|error| CacheError::io(&store_dir, error))?;

        // A corrupt index is replaced wholesale on the next successful write.
        let mut index = match Self::read_index(&store_dir).await {
            Ok(index) => index.unwrap_or_default(),
            Err(CacheError::CorruptIndex { .. }) => StoreIndex::default(),
            Err(error) => return Err(error),
        };

        let mut written = Vec::with_capacity(responses.len());
        let mut superseded = Vec::new();
        for response in responses {
            let body_file = format!("entry-{:06}.bin", index.next_body_id);
            index.next_body_id += 1;
            let body_path = store_dir.join(&body_file);
            if let Err(error) = fs::write(&body_path, &response.body).await {
                for path in &written {
                    let _ = fs::remove_file(path).await;
                }
                return Err(CacheError::io(&body_path, error));
            }
            written.push(body_path);

            let entry = IndexEntry {
                url: response.url.clone(),
                status: response.status,
                content_type: response.content_type.clone(),
                body_file,
                stored_at: chrono::Utc::now().to_rfc3339(),
            };
            if let Some(previous) = index.entries.insert(response.url, entry) {
                superseded.push(store_dir.join(previous.body_file));
            }
        }

        if let Err(error) = Self::write_index(&store_dir, &index).await {
            for path in &written {
                let _ = fs::remove_file(path).await;
            }
            return Err(error);
        }

        for path in superseded {
            let _ = fs::remove_file(path).await;
        }
        Ok(())
    }

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<ResourceResponse>, CacheError> {
        let store_dir = self.store_dir(name)?;
        let lock = self.store_lock(name);
        let _guard = lock.lock().await;
        let Some(index) = Self::read_index(&store_dir).await? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.get(key) else {
            return Ok(None);
        };

        let body_path = store_dir.join(&entry.body_file);
        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(CacheError::io(&body_path, error)),
        };

        Ok(Some(ResourceResponse {
            url: entry.url.clone(),
            status: entry.status,
            content_type: entry.content_type.clone(),
            body,
        }))
    }

    async fn store_names(&self) -> Result<Vec<String>, CacheError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(CacheError::io(&self.root, error)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| CacheError::io(&self.root, error))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_store(&self, name: &str) -> Result<bool, CacheError> {
        let store_dir = self.store_dir(name)?;
        let lock = self.store_lock(name);
        let _guard = lock.lock().await;
        match fs::remove_dir_all(&store_dir).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(CacheError::io(&store_dir, error)),
        }
    }
}
