use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{trace, warn};

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};

/// One cached extraction result with the hash of the source it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub content_hash: u64,
    pub fingerprint: String,
    pub data: T,
}

/// Content-addressed cache of per-file extraction results, kept in memory
/// and mirrored to disk so unchanged modules are skipped across runs.
///
/// Safe to share between rayon workers.
pub struct IncrementalCache<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Clone,
{
    memory_cache: DashMap<String, CacheEntry<T>>,
    cache_dir: PathBuf,
    /// Entries written under another fingerprint are ignored
    fingerprint: String,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<T> IncrementalCache<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Clone,
{
    pub fn new(cache_dir: impl AsRef<Path>, fingerprint: &str) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).map_err(|source| ExtractError::Io { path: cache_dir.clone(), source })?;

        Ok(Self {
            memory_cache: DashMap::new(),
            cache_dir,
            fingerprint: fingerprint.to_string(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    fn hash_content(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    fn cache_path(&self, file_path: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        self.fingerprint.hash(&mut hasher);
        self.cache_dir.join(format!("{:x}.json", hasher.finish()))
    }

    fn is_valid(&self, entry: &CacheEntry<T>, content_hash: u64) -> bool {
        entry.content_hash == content_hash && entry.fingerprint == self.fingerprint
    }

    /// Cached data for `file_path` if it was computed from `content`.
    pub fn get(&self, file_path: &str, content: &str) -> Option<T> {
        let found = self.lookup(file_path, Self::hash_content(content));
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn lookup(&self, file_path: &str, content_hash: u64) -> Option<T> {
        if let Some(entry) = self.memory_cache.get(file_path) {
            if self.is_valid(&entry, content_hash) {
                return Some(entry.data.clone());
            }
        }

        let cache_path = self.cache_path(file_path);
        let text = fs::read_to_string(&cache_path).ok()?;
        let entry = match serde_json::from_str::<CacheEntry<T>>(&text) {
            Ok(entry) => entry,
            Err(err) => {
                trace!(path = %cache_path.display(), error = %err, "discarding unreadable cache entry");
                return None;
            }
        };
        if !self.is_valid(&entry, content_hash) {
            return None;
        }
        let data = entry.data.clone();
        self.memory_cache.insert(file_path.to_string(), entry);
        Some(data)
    }

    /// Store `data` for `file_path`. Disk write failures only cost a
    /// future cache miss.
    pub fn set(&self, file_path: &str, content: &str, data: T) {
        let entry = CacheEntry {
            content_hash: Self::hash_content(content),
            fingerprint: self.fingerprint.clone(),
            data,
        };

        let cache_path = self.cache_path(file_path);
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(err) = fs::write(&cache_path, json) {
                    warn!(path = %cache_path.display(), error = %err, "failed to write cache entry");
                }
            }
            Err(err) => warn!(file = file_path, error = %err, "failed to serialize cache entry"),
        }

        self.memory_cache.insert(file_path.to_string(), entry);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory_cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cache_dir: self.cache_dir.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub memory_entries: usize,
    pub hits: usize,
    pub misses: usize,
    pub cache_dir: String,
}

/// Cache fingerprint for results produced by this build under `config`.
pub fn fingerprint(config: &ExtractionConfig) -> String {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(config).unwrap_or_default().hash(&mut hasher);
    format!("{}-{:x}", env!("CARGO_PKG_VERSION"), hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::metadata::{Route, RouteModule};

    fn module() -> RouteModule {
        RouteModule {
            name: "Session".into(),
            slug: "session".into(),
            routes: vec![Route::new("POST".into(), "/session/destroy".into(), None, vec![], vec![], vec![])],
        }
    }

    #[test]
    fn test_cache_hit_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::<RouteModule>::new(dir.path(), "1").unwrap();
        let content = "module.exports = () => []";

        assert!(cache.get("session.js", content).is_none());
        cache.set("session.js", content, module());
        assert_eq!(cache.get("session.js", content), Some(module()));
        assert!(cache.get("session.js", "module.exports = () => [1]").is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.memory_entries), (1, 2, 1));
    }

    #[test]
    fn test_persistent_cache() {
        let dir = tempfile::tempdir().unwrap();
        let content = "module.exports = () => []";
        {
            let cache = IncrementalCache::<RouteModule>::new(dir.path(), "1").unwrap();
            cache.set("session.js", content, module());
        }
        let cache = IncrementalCache::<RouteModule>::new(dir.path(), "1").unwrap();
        assert_eq!(cache.get("session.js", content), Some(module()));
    }

    #[test]
    fn test_fingerprint_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let content = "module.exports = () => []";
        IncrementalCache::<RouteModule>::new(dir.path(), "1").unwrap().set("session.js", content, module());

        let cache = IncrementalCache::<RouteModule>::new(dir.path(), "2").unwrap();
        assert!(cache.get("session.js", content).is_none());
    }

    #[test]
    fn test_fingerprint_tracks_config() {
        let mut config = ExtractionConfig::default();
        let before = fingerprint(&config);
        config.error_type = "ApiError".into();
        assert_ne!(before, fingerprint(&config));
        assert!(before.starts_with(env!("CARGO_PKG_VERSION")));
    }
}
