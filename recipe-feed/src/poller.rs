//! Feed source polling.
//!
//! Reads the newest posts from a Reddit-style listing endpoint. The
//! recipe-bearing text is the self-post body when there is one; for
//! link-posts the poller falls back to the top-level comment written by the
//! originating author (the common "recipe in the comments" pattern).

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{FeedError, FeedEvent};

const USER_AGENT: &str = "recipe-feed-poller";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    author: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    permalink: String,
}

/// Polls one feed source over HTTP.
#[derive(Clone, Debug)]
pub struct FeedPoller {
    http: reqwest::Client,
    base_url: String,
}

impl FeedPoller {
    pub fn new(base_url: &str) -> Self {
        FeedPoller {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch up to `limit` recent items from `source_id` and normalize each
    /// into a [`FeedEvent`]. Items with no recoverable text are dropped.
    #[instrument(name = "poll_feed", skip(self))]
    pub async fn poll(&self, source_id: &str, limit: usize) -> Result<Vec<FeedEvent>, FeedError> {
        let url = format!("{}/r/{}/new.json?limit={}", self.base_url, source_id, limit);
        let listing: Listing = self.fetch_json(&url).await?;

        let mut events = Vec::new();
        for child in listing.data.children {
            let post = child.data;
            let text = match self.recipe_text(&post).await {
                Some(text) => text,
                None => {
                    debug!(post = %post.id, "no recipe-bearing text, dropping");
                    continue;
                }
            };
            events.push(FeedEvent {
                date: DateTime::from_timestamp(post.created_utc as i64, 0)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
                title: post.title,
                author: post.author,
                num_comments: post.num_comments,
                char_count: text.chars().count(),
                text,
                post_id: Some(post.id),
                score: Some(post.score),
                url: (!post.permalink.is_empty())
                    .then(|| format!("{}{}", self.base_url, post.permalink)),
            });
        }
        Ok(events)
    }

    /// Self-post body, or the originating author's top-level comment.
    async fn recipe_text(&self, post: &Post) -> Option<String> {
        let body = post.selftext.trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
        if post.num_comments == 0 {
            return None;
        }
        match self.author_comment(&post.id, &post.author).await {
            Ok(found) => found,
            Err(err) => {
                warn!(post = %post.id, %err, "comment lookup failed");
                None
            }
        }
    }

    async fn author_comment(
        &self,
        post_id: &str,
        author: &str,
    ) -> Result<Option<String>, FeedError> {
        let url = format!("{}/comments/{}.json", self.base_url, post_id);
        let thread: Value = self.fetch_json(&url).await?;
        // Second listing in the thread payload holds top-level comments.
        let comments = thread
            .get(1)
            .and_then(|l| l["data"]["children"].as_array())
            .cloned()
            .unwrap_or_default();
        Ok(comments.iter().find_map(|c| {
            let data = &c["data"];
            (data["author"].as_str() == Some(author))
                .then(|| data["body"].as_str().unwrap_or_default().trim().to_string())
                .filter(|body| !body.is_empty())
        }))
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self
            .http
            .get(url)
            .header("user-agent", USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn listing_deserializes_the_fields_we_need()  {
        let raw = r#"{"data": {"children": [{"data": {
            "id": "t3_abc",
            "title": "My nonna's ragu",
            "author": "cook123",
            "selftext": "Ingredients\n- 1 lb beef",
            "num_comments": 12,
            "score": 420,
            "created_utc": 1700000000.0,
            "permalink": "/r/recipes/comments/t3_abc/"
        }}]}}"#;
        let listing: Listing = serde_json::from_str(raw).unwrap();
        let post = &listing.data.children[0].data;
        assert_eq!(post.title, "My nonna's ragu");
        assert_eq!(post.num_comments, 12);
        assert!(post.selftext.starts_with("Ingredients"));
    }
}
