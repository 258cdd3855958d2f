//! Namespace/operation pair that scopes cache entries.

use std::fmt;

/// Which owner and which action a cache entry belongs to, e.g.
/// `PubMed / search`. Both parts are single, sanitized path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope {
    namespace: String,
    operation: String,
}

impl CacheScope {
    pub fn new(namespace: impl AsRef<str>, operation: impl AsRef<str>) -> Self {
        Self {
            namespace: sanitize_segment(namespace.as_ref()),
            operation: sanitize_segment(operation.as_ref()),
        }
    }

    /// Scope named after a Rust type, so different owners never collide on
    /// the same operation name.
    ///
    /// `omnisearch::sources::PubMed<Client>` becomes `PubMed`.
    pub fn for_type<T: ?Sized>(operation: impl AsRef<str>) -> Self {
        Self::new(short_type_name::<T>(), operation)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.operation)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

/// Map a name onto one safe directory name.
fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}
