//! Synchronize-by-id incremental rebuilds.
//!
//! Layered on the core service: before the population routine runs, the
//! full set of currently indexed identifiers is captured; after it
//! returns, every identifier it did not revisit is deleted from the
//! index. This reconciles the collection against the upstream
//! authoritative source in one pass, pruning documents that were removed
//! upstream.
//!
//! Documents must carry the configured identifier field as a stored
//! string, and writes should go through [`SyncedSearchService::upsert`]
//! so the identifier's exact external form is the delete/update term.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::marker::PhantomData;
use std::ops::Deref;
use std::str::FromStr;

use tantivy::collector::DocSetCollector;
use tantivy::query::AllQuery;
use tantivy::schema::{Field, Value};
use tantivy::{IndexWriter, TantivyDocument, Term};
use tracing::{debug, info};

use crate::error::SearchError;
use crate::service::{HitMapper, SearchService};

/// Strategy for converting between an identifier's typed form and its
/// exact external string form, which is what the index stores and what
/// stale-document deletion matches on.
pub trait IdCodec: Send + Sync {
    type Id: Ord + Send;

    fn decode(&self, raw: &str) -> Result<Self::Id, SearchError>;
    fn encode(&self, id: &Self::Id) -> String;
}

/// Identifiers kept as plain strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringIds;

impl IdCodec for StringIds {
    type Id = String;

    fn decode(&self, raw: &str) -> Result<String, SearchError> {
        Ok(raw.to_string())
    }

    fn encode(&self, id: &String) -> String {
        id.clone()
    }
}

/// Identifiers parsed from their stored string form.
///
/// Covers numeric ids and any other `FromStr + Display` type whose
/// display form round-trips, e.g. `ParsedIds::<i64>::new()`.
pub struct ParsedIds<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ParsedIds<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ParsedIds<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdCodec for ParsedIds<T>
where
    T: FromStr + Display + Ord + Send,
    T::Err: Display,
{
    type Id = T;

    fn decode(&self, raw: &str) -> Result<T, SearchError> {
        raw.parse()
            .map_err(|e| SearchError::InvalidId(format!("{raw:?}: {e}")))
    }

    fn encode(&self, id: &T) -> String {
        id.to_string()
    }
}

/// A search service whose rebuilds reconcile the index against the
/// upstream source by identifier.
///
/// Derefs to the inner [`SearchService`] for querying.
pub struct SyncedSearchService<M: HitMapper, C: IdCodec> {
    service: SearchService<M>,
    ids: C,
    id_field: Field,
}

impl<M: HitMapper, C: IdCodec> SyncedSearchService<M, C> {
    /// Wrap a core service. The options' `id_field` must exist in the
    /// collection schema.
    pub fn new(service: SearchService<M>, ids: C) -> Result<Self, SearchError> {
        let name = service.options().id_field.clone();
        let id_field = service.schema().get_field(&name).map_err(|_| {
            SearchError::SchemaMismatch(format!("missing identifier field {name:?}"))
        })?;
        Ok(Self {
            service,
            ids,
            id_field,
        })
    }

    pub fn id_field(&self) -> Field {
        self.id_field
    }

    pub fn service(&self) -> &SearchService<M> {
        &self.service
    }

    /// Add or replace the document stored under `id`.
    pub fn upsert(
        &self,
        writer: &IndexWriter,
        id: &C::Id,
        doc: TantivyDocument,
    ) -> Result<(), SearchError> {
        let term = Term::from_field_text(self.id_field, &self.ids.encode(id));
        writer.delete_term(term);
        writer.add_document(doc)?;
        Ok(())
    }

    /// Rebuild from the authoritative source, pruning stale documents.
    ///
    /// `populate` receives the writer and the set of identifiers indexed
    /// before the rebuild; it must remove every identifier it revisits
    /// from the set. Whatever remains when it returns is deleted from the
    /// index before the commit. On the very first build the set starts
    /// empty.
    pub fn rebuild<F>(&self, populate: F) -> Result<(), SearchError>
    where
        F: FnOnce(&mut IndexWriter, &mut BTreeSet<C::Id>) -> Result<(), SearchError>,
    {
        let mut existing = self.scan_indexed_ids()?;
        info!(indexed = existing.len(), "Starting synchronized rebuild");

        self.service.rebuild(|writer| {
            populate(writer, &mut existing)?;

            // Identifiers the routine did not revisit are gone upstream
            if !existing.is_empty() {
                debug!(stale = existing.len(), "Pruning stale documents");
            }
            for id in &existing {
                let term = Term::from_field_text(self.id_field, &self.ids.encode(id));
                writer.delete_term(term);
            }
            Ok(())
        })
    }

    /// Capture every identifier currently in the index. Empty when the
    /// collection has never been built.
    fn scan_indexed_ids(&self) -> Result<BTreeSet<C::Id>, SearchError> {
        let mut ids = BTreeSet::new();
        if !self.service.ensure_ready(false)? {
            return Ok(ids);
        }

        self.service.refresh()?;
        let searcher = self.service.manager().acquire()?;
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(raw) = doc.get_first(self.id_field).and_then(|v| v.as_str()) {
                ids.insert(self.ids.decode(raw)?);
            }
        }
        Ok(ids)
    }
}

impl<M: HitMapper, C: IdCodec> Deref for SyncedSearchService<M, C> {
    type Target = SearchService<M>;

    fn deref(&self) -> &SearchService<M> {
        &self.service
    }
}
