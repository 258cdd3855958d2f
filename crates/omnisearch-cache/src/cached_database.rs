//! Disk-cached wrapper around any [`LiteratureDatabase`].
//!
//! `search` and `fetch` are memoized under the database's name, so PubMed
//! and Scopus results never share entries. `*_with` variants expose the
//! `force` flag.

use async_trait::async_trait;
use omnisearch_common::{LiteratureDatabase, Result, Table};
use tracing::instrument;

use crate::key::CallArgs;
use crate::scope::CacheScope;
use crate::store::DiskCache;

pub const SEARCH_OPERATION: &str = "search";
pub const FETCH_OPERATION: &str = "fetch";

pub struct CachedDatabase<D> {
    inner: D,
    cache: DiskCache,
}

impl<D: LiteratureDatabase> CachedDatabase<D> {
    pub fn new(inner: D, cache: DiskCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    pub fn scope(&self, operation: &str) -> CacheScope {
        CacheScope::new(self.inner.name(), operation)
    }

    /// Cached search. `force` re-runs the query and refreshes today's entry.
    #[instrument(skip(self), fields(db = self.inner.name()))]
    pub async fn search_with(
        &self,
        query: &str,
        max_results: usize,
        force: bool,
    ) -> Result<Option<Vec<String>>> {
        let args = CallArgs::new()
            .arg(query)
            .kwarg("max_results", &max_results)
            .force(force);

        self.cache
            .call_async(&self.scope(SEARCH_OPERATION), args, || {
                self.inner.search(query, max_results)
            })
            .await
    }

    /// Cached fetch. `force` re-fetches and refreshes today's entry.
    #[instrument(skip(self, ids), fields(db = self.inner.name(), n_ids = ids.len()))]
    pub async fn fetch_with(&self, ids: &[String], force: bool) -> Result<Option<Table>> {
        let args = CallArgs::new().arg(ids).force(force);

        self.cache
            .call_async(&self.scope(FETCH_OPERATION), args, || self.inner.fetch(ids))
            .await
    }
}

#[async_trait]
impl<D: LiteratureDatabase> LiteratureDatabase for CachedDatabase<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Option<Vec<String>>> {
        self.search_with(query, max_results, false).await
    }

    async fn fetch(&self, ids: &[String]) -> Result<Option<Table>> {
        self.fetch_with(ids, false).await
    }
}
