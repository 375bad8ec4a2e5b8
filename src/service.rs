//! The search service core.
//!
//! One long-lived [`SearchService`] owns the storage handle, searcher
//! manager, and parser pool for a single collection. Any number of
//! threads may search concurrently while a rebuild runs; a rebuild's
//! commit never invalidates snapshots already handed out.

use tantivy::collector::TopDocs;
use tantivy::query::Query;
use tantivy::schema::{Field, Schema};
use tantivy::tokenizer::TokenizerManager;
use tantivy::{IndexWriter, Order, TantivyDocument};
use tracing::info;

use crate::error::SearchError;
use crate::manager::SearcherManager;
use crate::options::ServiceOptions;
use crate::pool::ParserPool;
use crate::storage::{provider_from_options, DirectoryProvider};
use crate::writer::WriteSession;

/// Maps a matched record into an application result type.
///
/// The strategy object the application supplies instead of subclassing
/// the service.
pub trait HitMapper: Send + Sync {
    type Hit;

    fn map_hit(&self, score: f32, doc: TantivyDocument) -> Result<Self::Hit, SearchError>;
}

/// Result ordering for structured queries.
#[derive(Debug, Clone, Default)]
pub enum SortBy {
    /// Relevance score, best first.
    #[default]
    Relevance,
    /// A u64 fast field. Hits on this path carry a relevance score of 0.0
    /// since the engine does not score field-ordered collection.
    Field { field: String, order: Order },
}

/// Long-lived search service over one document collection.
pub struct SearchService<M: HitMapper> {
    schema: Schema,
    options: ServiceOptions,
    manager: SearcherManager,
    writer: WriteSession,
    pool: ParserPool,
    mapper: M,
}

impl<M: HitMapper> SearchService<M> {
    /// Open a collection through the given storage provider.
    ///
    /// The storage handle is created once here and owned for the life of
    /// the service. If the collection already has a committed index the
    /// service is searchable immediately; otherwise it stays unready
    /// until the first successful [`rebuild`](Self::rebuild).
    pub fn new(
        provider: &dyn DirectoryProvider,
        schema: Schema,
        query_fields: Vec<Field>,
        mapper: M,
        options: ServiceOptions,
    ) -> Result<Self, SearchError> {
        let directory = provider.create_directory()?;
        let manager = SearcherManager::new(directory.clone());
        let writer = WriteSession::new(directory, schema.clone(), options.writer_memory_mb);
        let pool = ParserPool::new(schema.clone(), query_fields, TokenizerManager::default());

        let service = Self {
            schema,
            options,
            manager,
            writer,
            pool,
            mapper,
        };
        service.manager.ensure_ready(false)?;
        Ok(service)
    }

    /// Open a collection with the provider implied by the options'
    /// storage mode.
    pub fn from_options(
        schema: Schema,
        query_fields: Vec<Field>,
        mapper: M,
        options: ServiceOptions,
    ) -> Result<Self, SearchError> {
        let provider = provider_from_options(&options);
        Self::new(provider.as_ref(), schema, query_fields, mapper, options)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn manager(&self) -> &SearcherManager {
        &self.manager
    }

    pub(crate) fn pool(&self) -> &ParserPool {
        &self.pool
    }

    /// Idempotently try to make the collection searchable. See
    /// [`SearcherManager::ensure_ready`].
    pub fn ensure_ready(&self, error_if_missing: bool) -> Result<bool, SearchError> {
        self.manager.ensure_ready(error_if_missing)
    }

    /// Make all committed writes visible to subsequently acquired
    /// snapshots, waiting for the reload to complete.
    pub fn refresh(&self) -> Result<(), SearchError> {
        self.manager.refresh(true)
    }

    /// Free-text search over the configured query fields.
    ///
    /// Results are capped at `max_results` and mapped through the
    /// service's [`HitMapper`]. Malformed input fails with
    /// [`SearchError::QuerySyntax`]; the parser is returned to the pool
    /// on every exit path.
    pub fn search(&self, query_text: &str) -> Result<Vec<M::Hit>, SearchError> {
        self.manager.ensure_ready(true)?;

        let parser = self.pool.acquire();
        let query = parser.parse_query(query_text)?;
        drop(parser);

        let hits = self.execute(query.as_ref(), self.options.max_results, &SortBy::Relevance)?;
        info!(query = query_text, results = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Search with a pre-built structured query, an optional explicit
    /// result cap, and a sort order.
    pub fn search_query(
        &self,
        query: &dyn Query,
        max_results: Option<usize>,
        sort: SortBy,
    ) -> Result<Vec<M::Hit>, SearchError> {
        self.manager.ensure_ready(true)?;
        let limit = max_results.unwrap_or(self.options.max_results);
        self.execute(query, limit, &sort)
    }

    fn execute(
        &self,
        query: &dyn Query,
        limit: usize,
        sort: &SortBy,
    ) -> Result<Vec<M::Hit>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.manager.acquire()?;
        let hits: Vec<(f32, tantivy::DocAddress)> = match sort {
            SortBy::Relevance => searcher.search(query, &TopDocs::with_limit(limit))?,
            SortBy::Field { field, order } => searcher
                .search(
                    query,
                    &TopDocs::with_limit(limit).order_by_u64_field(field.clone(), order.clone()),
                )?
                .into_iter()
                .map(|(_, addr)| (0.0, addr))
                .collect(),
        };

        let mut results = Vec::with_capacity(hits.len());
        for (score, addr) in hits {
            let doc: TantivyDocument = searcher.doc(addr)?;
            results.push(self.mapper.map_hit(score, doc)?);
        }
        Ok(results)
    }

    /// Rebuild the collection from the authoritative source.
    ///
    /// Opens a scoped write session, runs `populate` once, and commits on
    /// success. The new commit is published lazily: the next acquired
    /// snapshot picks it up, in-flight searches are unaffected. Call
    /// [`refresh`](Self::refresh) to force immediate visibility. A second
    /// concurrent rebuild fails with [`SearchError::WriterBusy`].
    pub fn rebuild<F>(&self, populate: F) -> Result<(), SearchError>
    where
        F: FnOnce(&mut IndexWriter) -> Result<(), SearchError>,
    {
        self.writer.run(populate)?;
        self.manager.refresh(false)
    }
}
