//! Embedding generation via an HTTP embedding service.
//!
//! The embedding service is treated as an opaque HTTP transport: only its
//! `generate(text) -> vector` contract is used (OpenAI-compatible
//! `/embeddings` endpoint). No particular model or provider is assumed
//! beyond `EmbeddingConfig`'s `base_url`/`model`/`dimensions`.

use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// HTTP-backed embedding client.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl EmbeddingService {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut value = reqwest::header::HeaderValue::from_str(&auth_value)
            .map_err(|e| Error::Config(format!("invalid embedding api key: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build embedding client: {}", e)))?;

        Ok(EmbeddingService {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions as usize,
        })
    }

    /// Generate an embedding for a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(vec![text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| Error::Provider("embedding service returned no vectors".into()))
    }

    /// Generate embeddings for multiple texts in one request.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let input: Vec<&str> = texts.iter().map(String::as_str).collect();
        let body = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "embedding service returned {}: {}",
                status, text
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("embedding response was not valid JSON: {}", e)))?;

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Configured output vector width.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: "http://localhost:9999".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            ..Default::default()
        }
    }

    #[test]
    fn dimensions_reflect_configuration() {
        let service = EmbeddingService::new(&config()).unwrap();
        assert_eq!(service.dimensions(), 1536);
    }

    #[tokio::test]
    async fn embed_batch_of_nothing_makes_no_request() {
        let service = EmbeddingService::new(&config()).unwrap();
        let result = service.embed_batch(vec![]).await.unwrap();
        assert!(result.is_empty());
    }
}
