//! # search-service
//!
//! A concurrent, long-lived search service layer over Tantivy.
//!
//! Applications open one [`SearchService`] per document collection and
//! share it across threads: any number of searches can run while the
//! collection is periodically rebuilt from its authoritative source.
//! Readers always observe a consistent point-in-time snapshot, and a
//! snapshot acquired before a rebuild's commit keeps serving valid
//! results until released.
//!
//! ## Components
//! - [`DirectoryProvider`]: persistent or ephemeral storage for a collection
//! - [`ParserPool`]: free-list reuse of query parsers
//! - [`SearcherManager`]: snapshot acquire/refresh protocol
//! - [`SearchService`]: query execution and scoped rebuilds
//! - [`SyncedSearchService`]: rebuilds that prune documents removed upstream
//!
//! ## Example
//! ```
//! use search_service::{
//!     HitMapper, SearchError, SearchService, ServiceOptions, StringIds,
//!     SyncedSearchService,
//! };
//! use tantivy::doc;
//! use tantivy::schema::{Schema, Value, STORED, STRING, TEXT};
//! use tantivy::TantivyDocument;
//!
//! struct Titles(tantivy::schema::Field);
//!
//! impl HitMapper for Titles {
//!     type Hit = String;
//!     fn map_hit(&self, _score: f32, doc: TantivyDocument) -> Result<String, SearchError> {
//!         Ok(doc.get_first(self.0).and_then(|v| v.as_str()).unwrap_or("").to_string())
//!     }
//! }
//!
//! # fn main() -> Result<(), SearchError> {
//! let mut builder = Schema::builder();
//! let id = builder.add_text_field("id", STRING | STORED);
//! let title = builder.add_text_field("title", TEXT | STORED);
//! let schema = builder.build();
//!
//! let service = SearchService::from_options(
//!     schema,
//!     vec![title],
//!     Titles(title),
//!     ServiceOptions::ephemeral(),
//! )?;
//! let service = SyncedSearchService::new(service, StringIds)?;
//!
//! service.rebuild(|writer, seen| {
//!     seen.remove("stale-doc");
//!     service.upsert(writer, &"1".to_string(), doc!(id => "1", title => "hello world"))
//! })?;
//!
//! assert_eq!(service.search("hello")?, vec!["hello world"]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod manager;
pub mod options;
pub mod pool;
pub mod service;
pub mod storage;
pub mod synced;

mod writer;

pub use error::SearchError;
pub use manager::SearcherManager;
pub use options::{ServiceOptions, StorageMode};
pub use pool::{ParserPool, PooledParser};
pub use service::{HitMapper, SearchService, SortBy};
pub use storage::{
    provider_from_options, DirectoryProvider, FileDirectoryProvider, RamDirectoryProvider,
};
pub use synced::{IdCodec, ParsedIds, StringIds, SyncedSearchService};
