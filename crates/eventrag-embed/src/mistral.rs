//! Mistral embeddings endpoint (`POST {base}/embeddings`).
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use eventrag_core::traits::Embedder;

/// Output width of `mistral-embed`.
pub const MISTRAL_EMBED_DIM: usize = 1024;

#[derive(Clone)]
pub struct MistralEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
    batch_size: usize,
    max_retries: usize,
}

impl MistralEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: String, dim: usize, batch_size: usize, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Mistral API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing Mistral embedding model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).context("invalid Mistral API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Mistral HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            dim,
            batch_size: batch_size.max(1),
            max_retries: 3,
        })
    }

    async fn embed_chunk(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest { model: &self.model, input: inputs };
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse =
                            resp.json().await.context("failed to parse Mistral embedding response")?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        anyhow::ensure!(
                            parsed.data.len() == inputs.len(),
                            "Mistral returned {} embeddings for {} inputs",
                            parsed.data.len(),
                            inputs.len()
                        );
                        return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                    }
                    let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "retrying Mistral embeddings request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    anyhow::bail!("Mistral embeddings request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "retrying Mistral embeddings request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err).context("Mistral embeddings request failed");
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl Embedder for MistralEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            debug!(batch = chunk.len(), "mistral embeddings request");
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
