//! Searcher lifecycle management.
//!
//! The manager owns the current read-only view of a collection. It starts
//! uninitialized when no committed index exists yet, becomes ready on the
//! first successful open, and hands out point-in-time [`Searcher`]
//! snapshots after that. A snapshot stays valid until dropped even if a
//! newer commit is published in the meantime; tantivy reference-counts the
//! underlying segment readers, so retirement happens when the last holder
//! releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tantivy::directory::error::OpenReadError;
use tantivy::directory::Directory;
use tantivy::{Index, IndexReader, ReloadPolicy, Searcher, TantivyError};
use tracing::debug;

use crate::error::SearchError;

/// Manages the reader over one collection's storage.
pub struct SearcherManager {
    directory: Box<dyn Directory>,
    reader: RwLock<Option<IndexReader>>,
    pending_reload: AtomicBool,
}

impl SearcherManager {
    pub(crate) fn new(directory: Box<dyn Directory>) -> Self {
        Self {
            directory,
            reader: RwLock::new(None),
            pending_reload: AtomicBool::new(false),
        }
    }

    /// Try to transition out of the uninitialized state.
    ///
    /// Returns `Ok(true)` once a reader is open. When no committed index
    /// exists yet the outcome depends on `error_if_missing`: `Ok(false)`
    /// keeps the condition tolerable so callers can probe again after the
    /// first rebuild, `Err(IndexNotYetCreated)` surfaces it. Idempotent;
    /// repeated calls keep trying until an open succeeds.
    pub fn ensure_ready(&self, error_if_missing: bool) -> Result<bool, SearchError> {
        {
            let guard = self
                .reader
                .read()
                .map_err(|e| SearchError::LockPoisoned(e.to_string()))?;
            if guard.is_some() {
                return Ok(true);
            }
        }

        let mut guard = self
            .reader
            .write()
            .map_err(|e| SearchError::LockPoisoned(e.to_string()))?;
        if guard.is_some() {
            return Ok(true);
        }

        match Index::open(self.directory.clone()) {
            Ok(index) => {
                let reader = index
                    .reader_builder()
                    .reload_policy(ReloadPolicy::Manual)
                    .try_into()?;
                *guard = Some(reader);
                debug!("Searcher manager ready");
                Ok(true)
            }
            Err(err) if is_missing_index(&err) => {
                if error_if_missing {
                    Err(SearchError::IndexNotYetCreated)
                } else {
                    debug!("No committed index yet; staying uninitialized");
                    Ok(false)
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pick up newer committed state.
    ///
    /// Blocking refreshes immediately; non-blocking defers the reload to
    /// the next `acquire`. Snapshots already handed out are unaffected
    /// either way.
    pub fn refresh(&self, blocking: bool) -> Result<(), SearchError> {
        if !blocking {
            self.pending_reload.store(true, Ordering::Release);
            return Ok(());
        }

        let guard = self
            .reader
            .read()
            .map_err(|e| SearchError::LockPoisoned(e.to_string()))?;
        if let Some(reader) = guard.as_ref() {
            reader.reload()?;
            self.pending_reload.store(false, Ordering::Release);
            debug!("Reloaded searcher");
        }
        Ok(())
    }

    /// Acquire the current snapshot.
    ///
    /// Performs the deferred first open if the manager is still
    /// uninitialized, then applies any pending refresh. The snapshot is
    /// released by dropping it.
    pub fn acquire(&self) -> Result<Searcher, SearchError> {
        self.ensure_ready(true)?;

        let guard = self
            .reader
            .read()
            .map_err(|e| SearchError::LockPoisoned(e.to_string()))?;
        let reader = guard.as_ref().ok_or(SearchError::IndexNotYetCreated)?;
        if self.pending_reload.swap(false, Ordering::AcqRel) {
            reader.reload()?;
            debug!("Applied deferred reload");
        }
        Ok(reader.searcher())
    }
}

fn is_missing_index(err: &TantivyError) -> bool {
    matches!(
        err,
        TantivyError::OpenReadError(OpenReadError::FileDoesNotExist(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::directory::RamDirectory;
    use tantivy::schema::{Schema, STORED, TEXT};
    use tantivy::{doc, Index};

    fn text_schema() -> (Schema, tantivy::schema::Field) {
        let mut builder = Schema::builder();
        let text = builder.add_text_field("text", TEXT | STORED);
        (builder.build(), text)
    }

    fn commit_doc(directory: &RamDirectory, value: &str) {
        let (schema, text) = text_schema();
        let index =
            Index::open_or_create(Box::new(directory.clone()) as Box<dyn Directory>, schema)
                .unwrap();
        let mut writer = index.writer(50_000_000).unwrap();
        writer.add_document(doc!(text => value)).unwrap();
        writer.commit().unwrap();
    }

    #[test]
    fn test_uninitialized_until_first_commit() {
        let directory = RamDirectory::create();
        let manager = SearcherManager::new(Box::new(directory.clone()));

        assert!(!manager.ensure_ready(false).unwrap());
        assert!(matches!(
            manager.ensure_ready(true),
            Err(SearchError::IndexNotYetCreated)
        ));
        assert!(matches!(
            manager.acquire(),
            Err(SearchError::IndexNotYetCreated)
        ));

        commit_doc(&directory, "hello");
        assert!(manager.ensure_ready(false).unwrap());
        assert_eq!(manager.acquire().unwrap().num_docs(), 1);
    }

    #[test]
    fn test_acquire_opens_after_first_commit() {
        let directory = RamDirectory::create();
        let manager = SearcherManager::new(Box::new(directory.clone()));
        assert!(matches!(
            manager.acquire(),
            Err(SearchError::IndexNotYetCreated)
        ));

        // Acquire alone must transition to ready once a commit exists
        commit_doc(&directory, "hello");
        assert_eq!(manager.acquire().unwrap().num_docs(), 1);
    }

    #[test]
    fn test_ensure_ready_is_idempotent() {
        let directory = RamDirectory::create();
        commit_doc(&directory, "hello");

        let manager = SearcherManager::new(Box::new(directory));
        assert!(manager.ensure_ready(false).unwrap());
        assert!(manager.ensure_ready(true).unwrap());
    }

    #[test]
    fn test_blocking_refresh_publishes_new_commit() {
        let directory = RamDirectory::create();
        commit_doc(&directory, "one");

        let manager = SearcherManager::new(Box::new(directory.clone()));
        manager.ensure_ready(true).unwrap();
        assert_eq!(manager.acquire().unwrap().num_docs(), 1);

        commit_doc(&directory, "two");
        manager.refresh(true).unwrap();
        assert_eq!(manager.acquire().unwrap().num_docs(), 2);
    }

    #[test]
    fn test_deferred_refresh_applies_on_next_acquire() {
        let directory = RamDirectory::create();
        commit_doc(&directory, "one");

        let manager = SearcherManager::new(Box::new(directory.clone()));
        manager.ensure_ready(true).unwrap();
        assert_eq!(manager.acquire().unwrap().num_docs(), 1);

        commit_doc(&directory, "two");
        manager.refresh(false).unwrap();
        assert_eq!(manager.acquire().unwrap().num_docs(), 2);
    }

    #[test]
    fn test_snapshot_stable_across_refresh() {
        let directory = RamDirectory::create();
        commit_doc(&directory, "one");

        let manager = SearcherManager::new(Box::new(directory.clone()));
        manager.ensure_ready(true).unwrap();
        let snapshot = manager.acquire().unwrap();

        commit_doc(&directory, "two");
        manager.refresh(true).unwrap();

        // The earlier snapshot keeps serving its point-in-time view
        assert_eq!(snapshot.num_docs(), 1);
        assert_eq!(manager.acquire().unwrap().num_docs(), 2);
    }
}
