//! Service configuration.
//!
//! Options are captured once at construction and never mutated afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the collection's index is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Directory-backed index at `index_path`, durable across restarts.
    #[default]
    Persistent,
    /// Fresh in-memory index, good for tests and throwaway collections.
    Ephemeral,
}

/// Immutable configuration for one search service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOptions {
    /// Where a persistent index is written. Defaults to `./search-index`
    /// next to the running process. Ignored in ephemeral mode.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Persistent or ephemeral storage.
    #[serde(default)]
    pub storage: StorageMode,

    /// The maximum number of results a free-text search returns. Results
    /// beyond this count are silently truncated. Defaults to 100.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Name of the stored identifier field used for upserts and for the
    /// reconciliation scan. Defaults to `id`.
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Memory budget for the index writer in MB.
    #[serde(default = "default_writer_memory")]
    pub writer_memory_mb: usize,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./search-index")
}

fn default_max_results() -> usize {
    100
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_writer_memory() -> usize {
    50
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            storage: StorageMode::default(),
            max_results: default_max_results(),
            id_field: default_id_field(),
            writer_memory_mb: default_writer_memory(),
        }
    }
}

impl ServiceOptions {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    /// Options for an ephemeral in-memory collection.
    pub fn ephemeral() -> Self {
        Self {
            storage: StorageMode::Ephemeral,
            ..Default::default()
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_writer_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ServiceOptions::default();
        assert_eq!(options.index_path, PathBuf::from("./search-index"));
        assert_eq!(options.storage, StorageMode::Persistent);
        assert_eq!(options.max_results, 100);
        assert_eq!(options.id_field, "id");
        assert_eq!(options.writer_memory_mb, 50);
    }

    #[test]
    fn test_builder() {
        let options = ServiceOptions::new("/tmp/idx")
            .with_max_results(25)
            .with_id_field("doc_id");
        assert_eq!(options.index_path, PathBuf::from("/tmp/idx"));
        assert_eq!(options.max_results, 25);
        assert_eq!(options.id_field, "doc_id");
    }

    #[test]
    fn test_ephemeral_constructor() {
        let options = ServiceOptions::ephemeral();
        assert_eq!(options.storage, StorageMode::Ephemeral);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: ServiceOptions =
            serde_json::from_str(r#"{"storage": "ephemeral", "max_results": 10}"#).unwrap();
        assert_eq!(options.storage, StorageMode::Ephemeral);
        assert_eq!(options.max_results, 10);
        assert_eq!(options.id_field, "id");
        assert_eq!(options.index_path, PathBuf::from("./search-index"));
    }

    #[test]
    fn test_json_round_trip() {
        let options = ServiceOptions::new("/data/idx").with_max_results(7);
        let json = serde_json::to_string(&options).unwrap();
        let decoded: ServiceOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.index_path, options.index_path);
        assert_eq!(decoded.max_results, 7);
    }
}
