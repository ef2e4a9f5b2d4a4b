//! Mistral chat completions client.
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use eventrag_core::config::MistralConfig;
use eventrag_core::traits::CompletionModel;

pub struct MistralChat {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl MistralChat {
    pub fn from_config(config: &MistralConfig) -> Result<Self> {
        anyhow::ensure!(!config.api_key.trim().is_empty(), "missing Mistral API key (set APP_MISTRAL__API_KEY)");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim())).context("invalid Mistral API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Mistral HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionModel for MistralChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("failed to call Mistral chat completions")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Mistral returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().await.context("failed to parse Mistral response")?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Mistral response had no choices")?;
        debug!(answer_chars = answer.len(), "completion received");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
