//! Chat-completion client for an OpenAI-compatible provider endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::AssistError;

/// The whole interface this crate demands of a language model.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        system_prompt: &str,
    ) -> Result<String, AssistError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

/// Reqwest-backed [`CompletionModel`] speaking the `/chat/completions`
/// wire contract. Provider base URL, key and model name come from
/// configuration; the client itself is cheap to clone and share.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, AssistError> {
        if api_key.is_empty() {
            return Err(AssistError::MissingKey);
        }
        Ok(ChatClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionModel for ChatClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        system_prompt: &str,
    ) -> Result<String, AssistError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "completion request rejected");
            return Err(AssistError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AssistError::EmptyResponse)
    }
}
