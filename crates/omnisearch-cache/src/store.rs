//! On-disk entry store.
//!
//! Layout: `root/<namespace>/<operation>/<YYYYMMDD>/<key>.json`.
//! Directories are created lazily on first write and entries are never
//! evicted. A newer date directory supersedes older ones for the same key.

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;
use tracing::{error, warn};

use crate::config::CacheConfig;
use crate::encoding::ensure_lossless;
use crate::error::Result;
use crate::key::CacheKey;
use crate::scope::CacheScope;

pub const ENTRY_EXTENSION: &str = "json";
pub const DATE_FORMAT: &str = "%Y%m%d";

/// A located entry: which day it was written and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Date-partitioned disk cache.
///
/// Cloning is cheap. Clones share the root and the I/O lock, so one
/// `DiskCache` handed to every wrapped operation serializes all entry reads
/// and writes process-wide.
///
/// The lock is per instance, not per root: two caches built separately over
/// the same directory do not exclude each other. That stays safe because
/// every write is a temp file renamed over the target, so a reader sees
/// either the previous entry or the new one, and concurrent writers to one
/// entry resolve as last-rename-wins.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl DiskCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::from_root(config.root)
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Today's date in local time, the partition new entries are written to.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn scope_dir(&self, scope: &CacheScope) -> PathBuf {
        self.root.join(scope.namespace()).join(scope.operation())
    }

    pub fn entry_path(&self, scope: &CacheScope, date: NaiveDate, key: &CacheKey) -> PathBuf {
        self.scope_dir(scope)
            .join(date.format(DATE_FORMAT).to_string())
            .join(key.file_name(ENTRY_EXTENSION))
    }

    /// Every dated entry for `key`, newest first.
    ///
    /// Directories whose names are not `YYYYMMDD` dates are skipped. A missing
    /// scope directory simply has no entries.
    pub fn entries(&self, scope: &CacheScope, key: &CacheKey) -> Vec<CacheEntry> {
        let scope_dir = self.scope_dir(scope);
        let read_dir = match std::fs::read_dir(&scope_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return vec![],
            Err(e) => {
                error!(dir = %scope_dir.display(), error = %e, "Failed to list cache directory");
                return vec![];
            }
        };

        let file_name = key.file_name(ENTRY_EXTENSION);
        let mut found = Vec::new();
        for dir_entry in read_dir.flatten() {
            if !dir_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let path = dir_entry.path().join(&file_name);
            if !path.is_file() {
                continue;
            }

            let name = dir_entry.file_name();
            match name.to_str().and_then(parse_date_dir) {
                Some(date) => found.push(CacheEntry { date, path }),
                None => warn!(
                    dir = %dir_entry.path().display(),
                    "Unexpected cache directory name format, skipping"
                ),
            }
        }

        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }

    /// The most recent entry for `key`, if any.
    pub fn lookup(&self, scope: &CacheScope, key: &CacheKey) -> Option<CacheEntry> {
        self.entries(scope, key).into_iter().next()
    }

    /// Read and deserialize an entry.
    pub fn load<T: DeserializeOwned>(&self, entry: &CacheEntry) -> Result<T> {
        let bytes = {
            let _guard = self.io_guard();
            std::fs::read(&entry.path)?
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Serialize `value` into the `date` partition, replacing any entry for the
    /// same key on that day. Returns the entry path.
    ///
    /// The bytes go to a temporary file beside the target which is then
    /// renamed over it, so readers never see a partial entry.
    ///
    /// Values JSON cannot hold exactly (NaN, infinities) are refused with
    /// [`CacheError::Lossy`](crate::error::CacheError::Lossy) and nothing is written.
    pub fn store<T: Serialize + ?Sized>(
        &self,
        scope: &CacheScope,
        key: &CacheKey,
        date: NaiveDate,
        value: &T,
    ) -> Result<PathBuf> {
        ensure_lossless(value)?;
        let bytes = serde_json::to_vec(value)?;
        let path = self.entry_path(scope, date, key);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.scope_dir(scope));

        let _guard = self.io_guard();
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&path)?;
        Ok(path)
    }

    /// [`DiskCache::store`] into today's partition.
    pub fn store_today<T: Serialize + ?Sized>(
        &self,
        scope: &CacheScope,
        key: &CacheKey,
        value: &T,
    ) -> Result<PathBuf> {
        self.store(scope, key, Self::today(), value)
    }

    fn io_guard(&self) -> MutexGuard<'_, ()> {
        // The mutex guards no data, so a panic elsewhere cannot leave it inconsistent.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_date_dir(name: &str) -> Option<NaiveDate> {
    if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(name, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::key::CallArgs;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn setup() -> (TempDir, DiskCache, CacheScope, CacheKey) {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::from_root(dir.path());
        let scope = CacheScope::new("PubMed", "search");
        let key = CallArgs::new().arg("KRAS").cache_key().unwrap();
        (dir, cache, scope, key)
    }

    #[test]
    fn test_parse_date_dir() {
        assert_eq!(parse_date_dir("20240115"), Some(date("20240115")));
        assert_eq!(parse_date_dir("2024-01-15"), None);
        assert_eq!(parse_date_dir("20241301"), None);
        assert_eq!(parse_date_dir("2024115"), None);
        assert_eq!(parse_date_dir("latest"), None);
    }

    #[test]
    fn test_entry_path_layout() {
        let (dir, cache, scope, key) = setup();
        let path = cache.entry_path(&scope, date("20240115"), &key);
        assert_eq!(
            path,
            dir.path()
                .join("PubMed")
                .join("search")
                .join("20240115")
                .join(format!("{key}.json"))
        );
    }

    #[test]
    fn test_lookup_missing_scope_is_miss() {
        let (_dir, cache, scope, key) = setup();
        assert!(cache.lookup(&scope, &key).is_none());
        assert!(!cache.scope_dir(&scope).exists());
    }

    #[test]
    fn test_lookup_picks_latest_date() {
        let (_dir, cache, scope, key) = setup();
        cache.store(&scope, &key, date("20240115"), &vec!["2"]).unwrap();
        cache.store(&scope, &key, date("20240101"), &vec!["1"]).unwrap();
        cache.store(&scope, &key, date("20231231"), &vec!["0"]).unwrap();

        let entries = cache.entries(&scope, &key);
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date("20240115"), date("20240101"), date("20231231")]);

        let latest = cache.lookup(&scope, &key).unwrap();
        assert_eq!(latest.date, date("20240115"));
        let value: Vec<String> = cache.load(&latest).unwrap();
        assert_eq!(value, vec!["2".to_string()]);
    }

    #[test]
    fn test_lookup_ignores_other_keys() {
        let (_dir, cache, scope, key) = setup();
        let other = CallArgs::new().arg("EGFR").cache_key().unwrap();
        cache.store(&scope, &other, date("20240101"), &1).unwrap();
        assert!(cache.lookup(&scope, &key).is_none());
    }

    #[test]
    fn test_lookup_skips_bad_directory_names() {
        let (_dir, cache, scope, key) = setup();
        cache.store(&scope, &key, date("20240101"), &1).unwrap();

        let bogus = cache.scope_dir(&scope).join("not-a-date");
        std::fs::create_dir_all(&bogus).unwrap();
        std::fs::write(bogus.join(key.file_name(ENTRY_EXTENSION)), b"2").unwrap();
        std::fs::write(cache.scope_dir(&scope).join("stray-file"), b"x").unwrap();

        let entries = cache.entries(&scope, &key);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date("20240101"));
    }

    #[test]
    fn test_store_overwrites_same_day() {
        let (_dir, cache, scope, key) = setup();
        let first = cache.store(&scope, &key, date("20240101"), &1).unwrap();
        let second = cache.store(&scope, &key, date("20240101"), &2).unwrap();
        assert_eq!(first, second);

        let entries = cache.entries(&scope, &key);
        assert_eq!(entries.len(), 1);
        let value: i32 = cache.load(&entries[0]).unwrap();
        assert_eq!(value, 2);

        // No temporary files left behind.
        let files = std::fs::read_dir(first.parent().unwrap()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_store_none_round_trips() {
        let (_dir, cache, scope, key) = setup();
        let none: Option<Vec<String>> = None;
        cache.store_today(&scope, &key, &none).unwrap();
        let entry = cache.lookup(&scope, &key).unwrap();
        assert_eq!(entry.date, DiskCache::today());
        let loaded: Option<Vec<String>> = cache.load(&entry).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_store_refuses_non_finite_floats() {
        let (_dir, cache, scope, key) = setup();

        let err = cache.store_today(&scope, &key, &Some(f64::NAN)).unwrap_err();
        assert!(matches!(err, CacheError::Lossy(_)));
        let err = cache.store_today(&scope, &key, &f64::INFINITY).unwrap_err();
        assert!(matches!(err, CacheError::Lossy(_)));
        assert!(cache.lookup(&scope, &key).is_none());
        assert!(!cache.scope_dir(&scope).exists());
    }

    #[test]
    fn test_store_finite_floats_round_trip_exactly() {
        let (_dir, cache, scope, key) = setup();
        let scores = vec![0.1 + 0.2, 1.0 / 3.0, -0.0, f64::MAX, f64::MIN_POSITIVE];
        cache.store_today(&scope, &key, &scores).unwrap();

        let entry = cache.lookup(&scope, &key).unwrap();
        let loaded: Vec<f64> = cache.load(&entry).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&loaded), bits(&scores));
    }

    #[test]
    fn test_load_corrupt_entry_is_error() {
        let (_dir, cache, scope, key) = setup();
        let path = cache.store(&scope, &key, date("20240101"), &1).unwrap();
        std::fs::write(&path, b"\x00\x9f not json").unwrap();

        let entry = cache.lookup(&scope, &key).unwrap();
        let err = cache.load::<i32>(&entry).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_store_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("occupied");
        std::fs::write(&root, b"not a directory").unwrap();

        let cache = DiskCache::from_root(&root);
        let scope = CacheScope::new("PubMed", "search");
        let key = CallArgs::new().cache_key().unwrap();
        let err = cache.store_today(&scope, &key, &1).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_clones_share_lock() {
        let (_dir, cache, _, _) = setup();
        let clone = cache.clone();
        assert!(Arc::ptr_eq(&cache.lock, &clone.lock));
    }
}
