//! Client for the external embedding service.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::retrieval::Embedder;

#[derive(Clone)]
pub struct EmbeddingClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    text: Vec<String>,
    normalize: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url,
            client: Client::new(),
            timeout,
        }
    }

    /// Embed a single text. The embedding model itself is an external
    /// collaborator; this client only owns transport and shape.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            text: vec![text.to_string()],
            normalize: true,
        };

        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to call embedding service")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding service error {}: {}", status, error_text);
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .context("Embedding service returned no vectors")
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text).await
    }
}
