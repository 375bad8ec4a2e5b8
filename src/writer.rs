//! Scoped write sessions.
//!
//! A session opens one writer over the collection's storage, runs the
//! caller's population routine exactly once, and commits on success. If
//! the routine fails the writer is dropped without committing, which
//! discards the pending changes, and the failure reaches the caller.
//! Only one session may be open per collection at a time.

use std::sync::{Mutex, TryLockError};

use tantivy::directory::Directory;
use tantivy::schema::Schema;
use tantivy::{Index, IndexWriter};
use tracing::{info, warn};

use crate::error::SearchError;

pub(crate) struct WriteSession {
    directory: Box<dyn Directory>,
    schema: Schema,
    memory_budget: usize,
    gate: Mutex<()>,
}

impl WriteSession {
    pub(crate) fn new(directory: Box<dyn Directory>, schema: Schema, memory_mb: usize) -> Self {
        Self {
            directory,
            schema,
            memory_budget: memory_mb * 1024 * 1024,
            gate: Mutex::new(()),
        }
    }

    /// Run `populate` inside a single-writer scope and commit its changes.
    ///
    /// Creates the index on first use. A concurrent session fails fast
    /// with [`SearchError::WriterBusy`].
    pub(crate) fn run<F>(&self, populate: F) -> Result<(), SearchError>
    where
        F: FnOnce(&mut IndexWriter) -> Result<(), SearchError>,
    {
        let _gate = self.gate.try_lock().map_err(|e| match e {
            TryLockError::WouldBlock => SearchError::WriterBusy,
            TryLockError::Poisoned(p) => SearchError::LockPoisoned(p.to_string()),
        })?;

        let index = Index::open_or_create(self.directory.clone(), self.schema.clone())?;
        let mut writer = index.writer(self.memory_budget)?;

        if let Err(err) = populate(&mut writer) {
            warn!(error = %err, "Population failed; aborting write session");
            return Err(err);
        }

        let opstamp = writer.commit()?;
        info!(opstamp, "Committed write session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::directory::RamDirectory;
    use tantivy::schema::{Schema, STORED, TEXT};
    use tantivy::{doc, Index};

    fn session_over(directory: &RamDirectory) -> (WriteSession, tantivy::schema::Field) {
        let mut builder = Schema::builder();
        let text = builder.add_text_field("text", TEXT | STORED);
        let schema = builder.build();
        (
            WriteSession::new(Box::new(directory.clone()), schema, 50),
            text,
        )
    }

    fn committed_docs(directory: &RamDirectory) -> u64 {
        let index = Index::open(Box::new(directory.clone()) as Box<dyn Directory>).unwrap();
        index.reader().unwrap().searcher().num_docs()
    }

    #[test]
    fn test_commit_on_success() {
        let directory = RamDirectory::create();
        let (session, text) = session_over(&directory);

        session
            .run(|writer| {
                writer.add_document(doc!(text => "hello")).unwrap();
                Ok(())
            })
            .unwrap();

        assert_eq!(committed_docs(&directory), 1);
    }

    #[test]
    fn test_population_failure_aborts() {
        let directory = RamDirectory::create();
        let (session, text) = session_over(&directory);

        session
            .run(|writer| {
                writer.add_document(doc!(text => "seed")).unwrap();
                Ok(())
            })
            .unwrap();

        let err = session
            .run(|writer| {
                writer.add_document(doc!(text => "doomed")).unwrap();
                Err(SearchError::population("authority unreachable"))
            })
            .unwrap_err();

        assert!(matches!(err, SearchError::Population(_)));
        assert_eq!(committed_docs(&directory), 1);
    }

    #[test]
    fn test_concurrent_session_rejected() {
        let directory = RamDirectory::create();
        let (session, text) = session_over(&directory);

        session
            .run(|writer| {
                writer.add_document(doc!(text => "outer")).unwrap();
                let err = session.run(|_| Ok(())).unwrap_err();
                assert!(matches!(err, SearchError::WriterBusy));
                Ok(())
            })
            .unwrap();
    }
}
