//! Per-identity persistent cache of repository aggregates.

use super::cache_lock::{CacheLockGuard, acquire_cache_lock};
use super::{CacheKey, RepoAggregate};
use crate::Result;
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     cache";

/// Mapping from repository cache key to its last known aggregate.
///
/// Backed by an ordered map so the persisted file is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cache {
    entries: BTreeMap<CacheKey, RepoAggregate>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&RepoAggregate> {
        self.entries.get(key)
    }

    /// Insert an entry under its own key, returning the entry it replaced.
    pub fn insert(&mut self, aggregate: RepoAggregate) -> Option<RepoAggregate> {
        self.entries.insert(aggregate.cache_key.clone(), aggregate)
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, CacheKey, RepoAggregate> {
        self.entries.iter()
    }

    pub fn values(&self) -> btree_map::Values<'_, CacheKey, RepoAggregate> {
        self.entries.values()
    }
}

impl FromIterator<RepoAggregate> for Cache {
    fn from_iter<I: IntoIterator<Item = RepoAggregate>>(iter: I) -> Self {
        let mut cache = Self::new();
        for aggregate in iter {
            let _ = cache.insert(aggregate);
        }
        cache
    }
}

/// Directory of per-identity cache files.
///
/// Each identity's cache lives in `<dir>/<sha256(identity)>.json`, with a sibling
/// `.lock` file used to serialize runs for the same identity.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.json", CacheKey::for_identity(identity)))
    }

    fn lock_path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", CacheKey::for_identity(identity)))
    }

    /// Take the exclusive lock for `identity`, creating the cache directory if needed.
    pub async fn lock(&self, identity: &str) -> Result<CacheLockGuard> {
        fs::create_dir_all(&self.dir).into_app_err_with(|| format!("unable to create cache directory '{}'", self.dir.display()))?;
        acquire_cache_lock(&self.lock_path_for(identity)).await
    }

    /// Load the cache for `identity`.
    ///
    /// Never fails: a missing file is a cold start, and an unreadable or corrupt file is
    /// reported and also treated as a cold start.
    #[must_use]
    pub fn load(&self, identity: &str) -> Cache {
        let path = self.path_for(identity);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "No cache for '{identity}' at '{}', starting cold", path.display());
                return Cache::new();
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unable to open cache file '{}', starting cold: {e:#}", path.display());
                return Cache::new();
            }
        };

        let entries: BTreeMap<CacheKey, RepoAggregate> = match serde_json::from_reader(BufReader::new(file)) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Cache file '{}' is corrupt, starting cold: {e:#}", path.display());
                return Cache::new();
            }
        };

        // The key inside each record is authoritative; a hand-edited map key is ignored.
        let cache: Cache = entries.into_values().collect();
        log::debug!(target: LOG_TARGET, "Loaded {} cached repositories for '{identity}'", cache.len());
        cache
    }

    /// Persist the cache for `identity`, replacing whatever was there.
    ///
    /// The data is written to a temporary sibling file which is synced and then renamed
    /// over the target, so a reader sees either the old or the new file, never a torn one.
    pub fn save(&self, identity: &str, cache: &Cache) -> Result<()> {
        let path = self.path_for(identity);
        fs::create_dir_all(&self.dir).into_app_err_with(|| format!("unable to create cache directory '{}'", self.dir.display()))?;

        let tmp_path = path.with_extension(format!("json.tmp.{}", std::process::id()));
        if let Err(e) = write_json(&tmp_path, &cache.entries) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).into_app_err_with(|| format!("unable to replace cache file '{}'", path.display()));
        }

        log::debug!(target: LOG_TARGET, "Saved {} cached repositories for '{identity}' to '{}'", cache.len(), path.display());
        Ok(())
    }
}

fn write_json(path: &Path, entries: &BTreeMap<CacheKey, RepoAggregate>) -> Result<()> {
    let file = File::create(path).into_app_err_with(|| format!("unable to create cache file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, entries).into_app_err_with(|| format!("unable to write cache file '{}'", path.display()))?;
    writer
        .flush()
        .into_app_err_with(|| format!("unable to flush cache file '{}'", path.display()))?;

    let file = writer
        .into_inner()
        .map_err(std::io::IntoInnerError::into_error)
        .into_app_err_with(|| format!("unable to flush cache file '{}'", path.display()))?;
    file.sync_all()
        .into_app_err_with(|| format!("unable to sync cache file '{}'", path.display()))
}
