//! Environment-driven configuration. Every external endpoint the pipeline
//! talks to comes from here; missing required values abort startup.

use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub search_url: String,
    pub search_index: String,
    pub redis_url: String,
    pub bus_topic: String,
    pub bus_group: String,
    pub feed_base_url: String,
    pub model_base_url: String,
    pub model_api_key: Option<String>,
    pub model_name: String,
    pub embedding_model: String,
    pub stage_dir: PathBuf,
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Read configuration from the environment (after `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Config {
            database_url: required("RECIPE_DATABASE_URL")?,
            search_url: optional("RECIPE_SEARCH_URL", "http://localhost:9200"),
            search_index: optional("RECIPE_SEARCH_INDEX", "recipes"),
            redis_url: optional("RECIPE_REDIS_URL", "redis://localhost:6379"),
            bus_topic: optional("RECIPE_BUS_TOPIC", "recipe-events"),
            bus_group: optional("RECIPE_BUS_GROUP", "recipe-loaders"),
            feed_base_url: optional("RECIPE_FEED_BASE_URL", "https://www.reddit.com"),
            model_base_url: optional("RECIPE_MODEL_BASE_URL", "https://openrouter.ai/api/v1"),
            model_api_key: std::env::var("RECIPE_MODEL_API_KEY").ok(),
            model_name: optional("RECIPE_MODEL_NAME", "qwen/qwen3-32b"),
            embedding_model: optional(
                "RECIPE_EMBEDDING_MODEL",
                recipe_search::DEFAULT_EMBEDDING_MODEL,
            ),
            stage_dir: PathBuf::from(optional("RECIPE_STAGE_DIR", "./staged")),
        })
    }
}
