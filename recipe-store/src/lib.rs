//! # Recipe Store
//!
//! Idempotent adapter over the relational store. All deduplication in the
//! pipeline funnels through [`RecipeStore::create`]:
//!
//! 1. a row with the same `identifier` wins (no write),
//! 2. else a row with the same normalized title wins (no write),
//! 3. else the recipe is inserted, with ingredient and measurement names
//!    upserted into their catalogs and junction rows keyed by order.
//!
//! Message buses replay, scrapers revisit posts, parsers get re-run — all
//! of those collapse into the same rule here, serialized by the unique
//! index on `identifier`. A concurrent loser observes the winner's row and
//! reports [`CreateOutcome::AlreadyExists`] instead of an error.
//!
//! The schema this adapter assumes is checked in as `schema.sql`; the
//! adapter never migrates.

use thiserror::Error;

mod rows;
mod store;

pub use rows::{CategoryCount, StoreStats, StoredRecipe};
pub use store::{CreateOutcome, RecipeStore, TextSearchFilters};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The record violates a recipe invariant; skip, don't retry.
    #[error("validation failed: {0}")]
    Validation(#[from] recipe_model::ValidationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Validation(_) => false,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
        }
    }
}
