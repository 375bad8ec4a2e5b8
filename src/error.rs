//! Search error types.

use thiserror::Error;

/// Errors that can occur during search and indexing operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Storage location could not be created or opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// No committed index exists yet; expected before the first rebuild
    #[error("No committed index exists yet")]
    IndexNotYetCreated,

    /// Malformed query text
    #[error("Query syntax error: {0}")]
    QuerySyntax(#[from] tantivy::query::QueryParserError),

    /// A write session was attempted while another is in flight
    #[error("Another write session is already in flight")]
    WriterBusy,

    /// A required field is missing from the collection schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A stored identifier could not be decoded
    #[error("Invalid document identifier: {0}")]
    InvalidId(String),

    /// A population callback failed; the write session was aborted
    #[error("Population failed: {0}")]
    Population(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A lock was poisoned by a panicking thread
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Wrap an application error raised inside a population callback.
    pub fn population<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        SearchError::Population(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::StorageUnavailable("permission denied".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: permission denied");

        let err = SearchError::IndexNotYetCreated;
        assert_eq!(err.to_string(), "No committed index exists yet");

        let err = SearchError::InvalidId("not-a-number".to_string());
        assert_eq!(err.to_string(), "Invalid document identifier: not-a-number");
    }

    #[test]
    fn test_population_wraps_source() {
        let err = SearchError::population("upstream fetch failed");
        assert!(err.to_string().contains("upstream fetch failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
