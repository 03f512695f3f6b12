//! # Model-Assisted Recipe Extraction
//!
//! Delegates extraction to an external text-completion model when the
//! pattern-based parser is likely to do poorly (the caller decides when).
//! The model is a replaceable collaborator behind the smallest possible
//! interface — [`CompletionModel::complete`] — and its output is held to
//! the same contract as the local parser: a loose recipe shape that goes
//! through the shared repair pass before staging.
//!
//! Schema failures are handled in two steps: one stricter re-prompt, then a
//! silent fall back to the local parser's output for that item. Transport
//! failures (timeouts, 5xx, rate limits) propagate to the caller, whose
//! retry policy owns backoff.

use thiserror::Error;

mod client;
mod extract;

pub use client::{ChatClient, ChatMessage, CompletionModel};
pub use extract::ModelAssistedParser;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model response carried no choices")]
    EmptyResponse,
    #[error("model provider key missing from configuration")]
    MissingKey,
}

impl AssistError {
    /// Rate limits and server errors are worth retrying with backoff;
    /// everything else aborts the attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssistError::Http(e) => e.is_timeout() || e.is_connect(),
            AssistError::Api { status, .. } => *status == 429 || *status >= 500,
            AssistError::EmptyResponse => false,
            AssistError::MissingKey => false,
        }
    }
}
