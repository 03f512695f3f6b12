//! # Recipe Jobs
//!
//! The orchestration layer: single-unit **activities** (parse one entry,
//! load one staged file, sync one row, poll the feed once, drain one bus
//! batch), **workflows** that compose them sequentially or fanned out, a
//! **retry policy** with exponential backoff and jitter, and the
//! **schedule controller** for recurring runs.
//!
//! ## Shape of the layer
//!
//! Activities hold all the business logic and all the I/O. Workflows only
//! sequence activities, pace them, and count outcomes — they keep no large
//! state in memory and never abort a batch for a single bad item.
//! Progress is recorded in the world, not in the workflow: a staged file
//! that exists is a completed extract, a store row that exists is a
//! completed load. Re-running a workflow with the same inputs completes the
//! gaps, which is the whole resumability story.
//!
//! Expensive collaborators (the store pool, the embedding model, the model
//! client) are constructed once per worker and shared through
//! [`ActivityContext`].

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use recipe_assist::ModelAssistedParser;
use recipe_parser::RecipeTextParser;
use recipe_search::{Embedder, SearchIndex};
use recipe_store::RecipeStore;

pub mod activities;
pub mod retry;
pub mod schedule;
pub mod workflows;

pub use activities::{ConsumeReport, ConsumeSink, LoadOutcome, ScrapeReport, SyncOneOutcome};
pub use retry::RetryPolicy;
pub use schedule::{OverlapPolicy, ScheduleSpec, ScheduleStatus, Scheduler};
pub use workflows::{BatchOptions, BatchSummary};

/// Per-worker singletons shared by every activity.
pub struct ActivityContext {
    pub parser: RecipeTextParser,
    pub assist: Option<ModelAssistedParser>,
    pub store: RecipeStore,
    pub search: SearchIndex,
    pub embedder: Arc<Embedder>,
    /// Directory of staged `<identifier>.json` handoff files.
    pub stage_dir: PathBuf,
    /// Bus and feed endpoints, used by the ingestion-edge activities.
    pub bus: BusConfig,
}

#[derive(Clone, Debug)]
pub struct BusConfig {
    pub redis_url: String,
    pub topic: String,
    pub consumer_group: String,
    pub feed_base_url: String,
}

#[derive(Error, Debug)]
pub enum JobError {
    /// Invariant violation; the item is skipped, never retried.
    #[error("validation failed: {0}")]
    Validation(#[from] recipe_model::ValidationError),
    #[error("staging failed: {0}")]
    Stage(#[from] recipe_model::StageError),
    #[error("store failed: {0}")]
    Store(recipe_store::StoreError),
    #[error("search failed: {0}")]
    Search(#[from] recipe_search::SearchError),
    #[error("model assist failed: {0}")]
    Assist(#[from] recipe_assist::AssistError),
    #[error("feed/bus failed: {0}")]
    Feed(#[from] recipe_feed::FeedError),
    #[error("batch entry {index} is out of range ({available} entries)")]
    MissingEntry { index: usize, available: usize },
    #[error("model-assisted extraction requested but no model is configured")]
    NoModel,
    #[error("activity timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("schedule {0} already exists")]
    ScheduleExists(String),
    #[error("unknown schedule {0}")]
    UnknownSchedule(String),
}

impl From<recipe_store::StoreError> for JobError {
    fn from(err: recipe_store::StoreError) -> Self {
        match err {
            recipe_store::StoreError::Validation(v) => JobError::Validation(v),
            other => JobError::Store(other),
        }
    }
}

impl JobError {
    /// Drives the retry policy: validation failures and other 4xx-class
    /// outcomes abort immediately, transport failures back off and retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Validation(_)
            | JobError::Stage(_)
            | JobError::MissingEntry { .. }
            | JobError::NoModel
            | JobError::ScheduleExists(_)
            | JobError::UnknownSchedule(_) => false,
            JobError::Store(e) => e.is_retryable(),
            JobError::Search(e) => e.is_retryable(),
            JobError::Assist(e) => e.is_retryable(),
            JobError::Feed(e) => e.is_retryable(),
            JobError::Timeout { .. } => true,
        }
    }

    /// Validation-class failures are recorded as per-item skips.
    pub fn is_skip(&self) -> bool {
        matches!(self, JobError::Validation(_) | JobError::MissingEntry { .. })
    }
}
