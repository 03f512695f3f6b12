//! # Recipe Feed
//!
//! The continuous ingestion edge: poll a feed source for fresh posts, push
//! normalized events onto a single bus topic keyed by author, and read them
//! back in batches on the consuming side.
//!
//! Delivery is at-least-once end to end. Neither the producer nor the
//! consumer tries to be exactly-once; replays are absorbed by the store's
//! dedup policy, which is the one place in the pipeline that owns it.
//! Consumer acknowledgements happen only after the downstream call returns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod bus;
mod poller;
mod sink;

pub use bus::{BusConsumer, BusMessage, BusProducer};
pub use poller::FeedPoller;
pub use sink::{append_events_csv, read_events_csv};

/// One normalized feed item: the recipe-bearing text of a post plus enough
/// source metadata to attribute and dedup it downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub date: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub num_comments: i64,
    pub text: String,
    #[serde(default)]
    pub char_count: usize,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("bus error: {0}")]
    Bus(#[from] redis::RedisError),
    #[error("event payload was not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Http(e) => e.is_timeout() || e.is_connect(),
            FeedError::Api { status, .. } => *status == 429 || *status >= 500,
            FeedError::Bus(e) => e.is_timeout() || e.is_connection_dropped(),
            FeedError::Payload(_) | FeedError::Csv(_) | FeedError::Io(_) => false,
        }
    }
}
