//! # Recipe Search
//!
//! Projection of stored recipes into a full-text/semantic index, and the
//! query assembly for all three search modes:
//!
//! - **text**: multi-field lexical match (`title^2`, `description`, nested
//!   `ingredients.name`) with optional term and range filters
//! - **semantic**: kNN over the 384-dimension `embedding` field
//! - **hybrid**: the text clauses and a boosted kNN clause in one request
//!
//! The index is an external service spoken to over its JSON API; this crate
//! owns the mapping, the bulk path and the query bodies, nothing else.
//! Sync never deletes documents — compaction is administrative tooling.

use thiserror::Error;

mod doc;
mod embed;
mod index;
mod query;
mod sync;

pub use doc::RecipeDoc;
pub use embed::{Embedder, SentenceEncoder, DEFAULT_EMBEDDING_MODEL};
pub use index::{BulkReport, SearchHit, SearchIndex, DEFAULT_BULK_BATCH};
pub use query::{SearchFilters, SearchMode, SearchRequest};
pub use sync::{sync_all, SyncReport};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search index request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search index returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("embedding model unavailable: {0}")]
    Model(String),
    #[error("embedding has {len} dimensions, need at least {expected}")]
    Dimension { len: usize, expected: usize },
    #[error("store error during sync: {0}")]
    Store(#[from] recipe_store::StoreError),
}

impl SearchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Http(e) => e.is_timeout() || e.is_connect(),
            SearchError::Api { status, .. } => *status == 429 || *status >= 500,
            SearchError::Model(_) | SearchError::Dimension { .. } => false,
            SearchError::Store(e) => e.is_retryable(),
        }
    }
}
