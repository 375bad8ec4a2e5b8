//! Storage providers for collection directories.
//!
//! A provider opens or creates the physical location backing one
//! collection. The persistent variant ensures the target directory exists
//! before opening it; the ephemeral variant hands out a fresh in-memory
//! store on every call.

use std::path::PathBuf;

use tantivy::directory::{Directory, MmapDirectory, RamDirectory};
use tracing::{debug, info};

use crate::error::SearchError;
use crate::options::{ServiceOptions, StorageMode};

/// Opens the storage location backing one search collection.
pub trait DirectoryProvider: Send + Sync {
    /// Open or create the storage handle.
    ///
    /// Fails with [`SearchError::StorageUnavailable`] if the location
    /// cannot be created or opened.
    fn create_directory(&self) -> Result<Box<dyn Directory>, SearchError>;
}

/// Directory-backed storage at a fixed filesystem path.
pub struct FileDirectoryProvider {
    index_path: PathBuf,
}

impl FileDirectoryProvider {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
        }
    }

    pub fn from_options(options: &ServiceOptions) -> Self {
        Self::new(options.index_path.clone())
    }
}

impl DirectoryProvider for FileDirectoryProvider {
    fn create_directory(&self) -> Result<Box<dyn Directory>, SearchError> {
        if !self.index_path.exists() {
            info!(path = ?self.index_path, "Creating index directory");
            std::fs::create_dir_all(&self.index_path).map_err(|e| {
                SearchError::StorageUnavailable(format!(
                    "cannot create {}: {}",
                    self.index_path.display(),
                    e
                ))
            })?;
        }

        let dir = MmapDirectory::open(&self.index_path).map_err(|e| {
            SearchError::StorageUnavailable(format!(
                "cannot open {}: {}",
                self.index_path.display(),
                e
            ))
        })?;
        debug!(path = ?self.index_path, "Opened mmap directory");
        Ok(Box::new(dir))
    }
}

/// In-memory storage with no persistence.
///
/// Each `create_directory` call yields an independent store; nothing is
/// shared between calls.
#[derive(Default)]
pub struct RamDirectoryProvider;

impl RamDirectoryProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryProvider for RamDirectoryProvider {
    fn create_directory(&self) -> Result<Box<dyn Directory>, SearchError> {
        debug!("Created ram directory");
        Ok(Box::new(RamDirectory::create()))
    }
}

/// Select a provider from the configured storage mode.
pub fn provider_from_options(options: &ServiceOptions) -> Box<dyn DirectoryProvider> {
    match options.storage {
        StorageMode::Persistent => Box::new(FileDirectoryProvider::from_options(options)),
        StorageMode::Ephemeral => Box::new(RamDirectoryProvider::new()),
    }
}
