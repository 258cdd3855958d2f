//! Literature database contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::table::Table;

/// Common interface for literature databases (citation and abstract indexes).
///
/// Implementations are expected to be deterministic for a given set of
/// arguments over short time spans, which is what makes their results
/// cacheable on disk.
#[async_trait]
pub trait LiteratureDatabase: Send + Sync {
    /// Stable database name, e.g. `"PubMed"`. Used as the cache namespace.
    fn name(&self) -> &str;

    /// Search for records matching a query and return their identifiers.
    ///
    /// Returns `None` when the source found nothing.
    async fn search(&self, query: &str, max_results: usize) -> Result<Option<Vec<String>>>;

    /// Fetch the records for a list of identifiers as a table.
    async fn fetch(&self, ids: &[String]) -> Result<Option<Table>>;
}
