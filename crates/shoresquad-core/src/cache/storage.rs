use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{CacheError, RequestKey};
use crate::net::Response;

const FILE_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = "tmp";

/// Holds the name of the active generation. No extension, so it is never
/// mistaken for a generation file.
const ACTIVE_FILE: &str = "active";

/// A response snapshot as stored in a cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub key: RequestKey,
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(key: RequestKey, response: Response) -> Self {
        Self {
            key,
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Negative ages come from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// On-disk layout of one generation.
#[derive(Serialize, Deserialize)]
struct GenerationFile {
    name: String,
    entries: Vec<CachedResponse>,
}

type Generation = BTreeMap<RequestKey, CachedResponse>;

struct Inner {
    dir: Option<PathBuf>,
    generations: RwLock<BTreeMap<String, Generation>>,
    active: RwLock<Option<String>>,
    /// Held by every mutation. Readers only ever take `generations` briefly,
    /// never across disk I/O.
    writer: Mutex<()>,
}

/// Handle to every cache generation. Clone is cheap and clones share state.
#[derive(Clone)]
pub struct CacheStorage {
    inner: Arc<Inner>,
}

impl CacheStorage {
    fn with_state(
        dir: Option<PathBuf>,
        generations: BTreeMap<String, Generation>,
        active: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir,
                generations: RwLock::new(generations),
                active: RwLock::new(active),
                writer: Mutex::new(()),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_state(None, BTreeMap::new(), None)
    }

    /// Open a directory-backed storage, loading every generation file in it.
    /// Unreadable files are skipped so one bad generation never blocks startup.
    pub async fn open_dir(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| CacheError::Io { path: dir.clone(), source })?;

        let mut generations = BTreeMap::new();
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|source| CacheError::Io { path: dir.clone(), source })?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|source| CacheError::Io { path: dir.clone(), source })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) || !path.is_file() {
                continue;
            }
            match Self::load_file(&path).await {
                Ok(file) => {
                    // The file name is what delete and persist act on
                    let stem = path.file_stem().and_then(|s| s.to_str());
                    if stem != Some(file.name.as_str()) || Self::validate_name(&file.name).is_err() {
                        warn!(path = %path.display(), cache = %file.name, "Skipping cache file whose name does not match");
                        continue;
                    }
                    debug!(cache = %file.name, entries = file.entries.len(), "Loaded cache generation");
                    let generation = file
                        .entries
                        .into_iter()
                        .map(|entry| (entry.key.clone(), entry))
                        .collect();
                    generations.insert(file.name, generation);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable cache file");
                }
            }
        }

        let active = Self::load_active(&dir).await;
        Ok(Self::with_state(Some(dir), generations, active))
    }

    async fn load_file(path: &Path) -> Result<GenerationFile, CacheError> {
        let contents = tokio::fs::read(path).await.map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&contents).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn load_active(dir: &Path) -> Option<String> {
        let path = dir.join(ACTIVE_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let name = contents.trim();
                if Self::validate_name(name).is_ok() {
                    Some(name.to_string())
                } else {
                    warn!(path = %path.display(), "Ignoring invalid active generation record");
                    None
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable active generation record");
                None
            }
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.inner.dir.as_deref()
    }

    fn file_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, FILE_EXTENSION))
    }

    /// Generation names double as file names, so keep them to a safe alphabet.
    fn validate_name(name: &str) -> Result<(), CacheError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(())
        } else {
            Err(CacheError::InvalidName(name.to_string()))
        }
    }

    /// Write through a temp file and rename it into place.
    async fn write_atomically(path: &Path, contents: Vec<u8>) -> Result<(), CacheError> {
        let mut temp = path.as_os_str().to_owned();
        temp.push(format!(".{}", TEMP_SUFFIX));
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, contents)
            .await
            .map_err(|source| CacheError::Io { path: temp.clone(), source })?;
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|source| CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Write a whole generation to disk. Callers hold the writer gate.
    async fn persist(&self, name: &str, generation: &Generation) -> Result<(), CacheError> {
        let Some(dir) = self.directory() else {
            return Ok(());
        };

        let file = GenerationFile {
            name: name.to_string(),
            entries: generation.values().cloned().collect(),
        };
        let contents = serde_json::to_vec_pretty(&file).map_err(|source| CacheError::Encode {
            name: name.to_string(),
            source,
        })?;

        Self::write_atomically(&Self::file_path(dir, name), contents).await
    }

    /// `caches.open(name)`: returns the generation, creating it if absent.
    pub async fn open(&self, name: &str) -> Result<Cache, CacheError> {
        Self::validate_name(name)?;

        if !self.has(name).await {
            let _writer = self.inner.writer.lock().await;
            if !self.has(name).await {
                let generation = Generation::new();
                self.persist(name, &generation).await?;
                self.inner
                    .generations
                    .write()
                    .await
                    .insert(name.to_string(), generation);
                debug!(cache = name, "Created cache generation");
            }
        }

        Ok(Cache {
            storage: self.clone(),
            name: name.to_string(),
        })
    }

    pub async fn has(&self, name: &str) -> bool {
        self.inner.generations.read().await.contains_key(name)
    }

    /// Names of every generation, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.generations.read().await.keys().cloned().collect()
    }

    /// `caches.delete(name)`: `Ok(false)` when there was nothing to delete.
    pub async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let _writer = self.inner.writer.lock().await;
        if !self.has(name).await {
            return Ok(false);
        }

        if let Some(dir) = self.directory() {
            let path = Self::file_path(dir, name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }

        self.inner.generations.write().await.remove(name);
        debug!(cache = name, "Deleted cache generation");
        Ok(true)
    }

    /// Look up `key` in one generation. A missing generation is a miss.
    pub async fn match_entry(&self, name: &str, key: &RequestKey) -> Option<Response> {
        self.inner
            .generations
            .read()
            .await
            .get(name)
            .and_then(|generation| generation.get(key))
            .map(|entry| entry.response.clone())
    }

    /// The generation of the version that last activated, if any. Survives
    /// restarts for directory-backed storage.
    pub async fn active(&self) -> Option<String> {
        self.inner.active.read().await.clone()
    }

    /// Record `name` as the generation of the activated version.
    pub async fn set_active(&self, name: &str) -> Result<(), CacheError> {
        Self::validate_name(name)?;

        let _writer = self.inner.writer.lock().await;
        if let Some(dir) = self.directory() {
            Self::write_atomically(&dir.join(ACTIVE_FILE), name.as_bytes().to_vec()).await?;
        }
        *self.inner.active.write().await = Some(name.to_string());
        debug!(cache = name, "Recorded active cache generation");
        Ok(())
    }
}

/// One opened cache generation.
#[derive(Clone)]
pub struct Cache {
    storage: CacheStorage,
    name: String,
}

impl Cache {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, key: &RequestKey) -> Option<Response> {
        self.storage.match_entry(&self.name, key).await
    }

    pub async fn put(&self, key: RequestKey, response: Response) -> Result<(), CacheError> {
        self.put_all(vec![(key, response)]).await
    }

    /// Store every entry or none of them. Later entries for the same key
    /// replace earlier ones.
    ///
    /// The new generation is written to disk before it replaces the old one
    /// in memory; lookups keep seeing the old one until then.
    pub async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> Result<(), CacheError> {
        if let Some((key, _)) = entries.iter().find(|(key, _)| !key.is_get()) {
            return Err(CacheError::UnsupportedMethod(key.method.clone()));
        }

        let inner = &self.storage.inner;
        let _writer = inner.writer.lock().await;
        let mut updated = inner
            .generations
            .read()
            .await
            .get(&self.name)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(self.name.clone()))?;

        for (key, response) in entries {
            updated.insert(key.clone(), CachedResponse::new(key, response));
        }

        self.storage.persist(&self.name, &updated).await?;
        inner.generations.write().await.insert(self.name.clone(), updated);
        Ok(())
    }

    pub async fn keys(&self) -> Vec<RequestKey> {
        self.storage
            .inner
            .generations
            .read()
            .await
            .get(&self.name)
            .map(|generation| generation.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn entries(&self) -> Vec<CachedResponse> {
        self.storage
            .inner
            .generations
            .read()
            .await
            .get(&self.name)
            .map(|generation| generation.values().cloned().collect())
            .unwrap_or_default()
    }
}
