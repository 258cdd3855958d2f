//! omnisearch-cache — Argument-keyed, date-partitioned disk cache.
//!
//! Wraps expensive, deterministic operations (literature database searches
//! and fetches) and short-circuits repeated calls with the same arguments:
//! - Cache keys: SHA-256 over the canonical JSON of the call arguments
//! - Layout: `root/<namespace>/<operation>/<YYYYMMDD>/<key>.json`
//! - Freshness: the most recent dated entry for a key wins
//! - Bypass: `force` recomputes and refreshes today's entry
//!
//! Cache failures are never surfaced to callers; only the wrapped
//! operation's own errors are.

pub mod cached_database;
pub mod config;
pub mod encoding;
pub mod error;
pub mod key;
pub mod memoize;
pub mod scope;
pub mod store;

pub use cached_database::CachedDatabase;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use key::{CacheKey, CallArgs};
pub use scope::CacheScope;
pub use store::{CacheEntry, DiskCache};
