//! Memoizing call path.
//!
//! Per call: derive key → bypass? → hit? → miss. Every cache-layer failure
//! is logged and absorbed; only the wrapped operation's error reaches the
//! caller, and a failed operation is never persisted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, error};

use crate::key::{CacheKey, CallArgs};
use crate::scope::CacheScope;
use crate::store::DiskCache;

enum Plan<T> {
    /// No usable key; run the operation and persist nothing.
    Uncached,
    Hit(T),
    Compute(CacheKey),
}

impl DiskCache {
    /// Run `op` through the cache.
    ///
    /// Returns the latest stored result for these arguments if one exists,
    /// otherwise runs `op` and stores its successful result under today's
    /// date. With `args.force(true)` the lookup is skipped and today's entry
    /// is refreshed.
    pub fn call<T, E, F>(&self, scope: &CacheScope, args: CallArgs, op: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        match self.plan(scope, &args) {
            Plan::Uncached => op(),
            Plan::Hit(value) => Ok(value),
            Plan::Compute(key) => {
                let value = op()?;
                self.persist(scope, &key, &value);
                Ok(value)
            }
        }
    }

    /// Async variant of [`DiskCache::call`]. The operation's future runs
    /// outside the I/O lock.
    ///
    /// Entry reads and writes are blocking `std::fs` calls made on the
    /// calling task, under a `std::sync::Mutex` that is never held across an
    /// await. Entries are small (id lists, result tables), so this costs a
    /// few milliseconds at most; callers caching very large payloads on a
    /// latency-sensitive runtime should wrap the call in `spawn_blocking`.
    pub async fn call_async<T, E, F, Fut>(
        &self,
        scope: &CacheScope,
        args: CallArgs,
        op: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.plan(scope, &args) {
            Plan::Uncached => op().await,
            Plan::Hit(value) => Ok(value),
            Plan::Compute(key) => {
                let value = op().await?;
                self.persist(scope, &key, &value);
                Ok(value)
            }
        }
    }

    fn plan<T: DeserializeOwned>(&self, scope: &CacheScope, args: &CallArgs) -> Plan<T> {
        let key = match args.cache_key() {
            Ok(key) => key,
            Err(e) => {
                error!(
                    namespace = scope.namespace(),
                    operation = scope.operation(),
                    error = %e,
                    "Failed to create cache key, executing uncached"
                );
                return Plan::Uncached;
            }
        };

        if args.is_forced() {
            debug!(
                namespace = scope.namespace(),
                operation = scope.operation(),
                key = %key,
                "Force flag set, bypassing cache"
            );
            return Plan::Compute(key);
        }

        if let Some(entry) = self.lookup(scope, &key) {
            debug!(
                namespace = scope.namespace(),
                operation = scope.operation(),
                key = %key,
                date = %entry.date,
                "Cache hit"
            );
            match self.load(&entry) {
                Ok(value) => {
                    debug!(path = %entry.path.display(), "Loaded result from cache");
                    return Plan::Hit(value);
                }
                Err(e) => error!(
                    path = %entry.path.display(),
                    error = %e,
                    "Failed to read cache entry"
                ),
            }
        }

        debug!(
            namespace = scope.namespace(),
            operation = scope.operation(),
            key = %key,
            "Cache miss, executing"
        );
        Plan::Compute(key)
    }

    fn persist<T: Serialize>(&self, scope: &CacheScope, key: &CacheKey, value: &T) {
        match self.store_today(scope, key, value) {
            Ok(path) => debug!(path = %path.display(), "Result cached"),
            Err(e) => error!(
                namespace = scope.namespace(),
                operation = scope.operation(),
                key = %key,
                error = %e,
                "Failed to write cache entry"
            ),
        }
    }
}
