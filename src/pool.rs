//! Free-list pool of query parsers.
//!
//! Building a parser is not free and a parser instance is not meant to be
//! shared between concurrent calls, but it is fine to reuse sequentially.
//! The pool hands out any available instance and grows on demand; peak
//! concurrency bounds its size in practice.

use std::ops::Deref;
use std::sync::Mutex;

use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema};
use tantivy::tokenizer::TokenizerManager;
use tracing::debug;

/// Thread-safe reuse pool for [`QueryParser`] instances.
///
/// `acquire` never fails: when the free list is empty a new parser is
/// built against the configured query fields and tokenizers.
pub struct ParserPool {
    schema: Schema,
    query_fields: Vec<Field>,
    tokenizers: TokenizerManager,
    free: Mutex<Vec<QueryParser>>,
}

impl ParserPool {
    pub fn new(schema: Schema, query_fields: Vec<Field>, tokenizers: TokenizerManager) -> Self {
        Self {
            schema,
            query_fields,
            tokenizers,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Check out a parser. The returned guard puts it back on drop, on
    /// every exit path.
    pub fn acquire(&self) -> PooledParser<'_> {
        let reused = self.free.lock().ok().and_then(|mut free| free.pop());
        let parser = reused.unwrap_or_else(|| {
            debug!("Constructing new query parser");
            QueryParser::new(
                self.schema.clone(),
                self.query_fields.clone(),
                self.tokenizers.clone(),
            )
        });
        PooledParser {
            pool: self,
            parser: Some(parser),
        }
    }

    fn release(&self, parser: QueryParser) {
        // A poisoned free list just means the parser is dropped instead of
        // reused; the pool stays usable.
        if let Ok(mut free) = self.free.lock() {
            free.push(parser);
        }
    }

    /// Number of parsers currently on the free list.
    pub fn idle(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

/// A parser checked out of a [`ParserPool`].
///
/// Not for sharing across threads while checked out; dropping the guard
/// returns the parser to the pool.
pub struct PooledParser<'a> {
    pool: &'a ParserPool,
    parser: Option<QueryParser>,
}

impl Deref for PooledParser<'_> {
    type Target = QueryParser;

    fn deref(&self) -> &QueryParser {
        self.parser.as_ref().expect("parser present until drop")
    }
}

impl Drop for PooledParser<'_> {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            self.pool.release(parser);
        }
    }
}
