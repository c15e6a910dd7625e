//! Embedding providers.
//!
//! `HashEmbedder` is deterministic and offline; it exists so ingestion and
//! retrieval can be exercised without a network dependency. `OpenAiEmbedder`
//! talks to any OpenAI-compatible `/v1/embeddings` endpoint.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use twox_hash::XxHash64;

use musea_core::config::EmbeddingSettings;
use musea_core::traits::EmbedProvider;
use musea_core::Error;

pub struct HashEmbedder {
    dim: usize,
    space: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            space: format!("hash:xx64:d{dim}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl EmbedProvider for HashEmbedder {
    fn space_id(&self) -> &str {
        &self.space
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
    space: String,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: &str, model: &str, dim: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dim,
            space: format!("openai:{model}:d{dim}"),
        }
    }
}

#[async_trait]
impl EmbedProvider for OpenAiEmbedder {
    fn space_id(&self) -> &str {
        &self.space
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dim,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("embeddings request failed ({status}): {text}"));
        }
        let payload: Value = res.json().await?;
        let data = payload["data"]
            .as_array()
            .ok_or_else(|| anyhow!("embeddings response missing data array"))?;
        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"]
                .as_array()
                .ok_or_else(|| anyhow!("embeddings response item missing embedding"))?;
            let vec: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            if vec.len() != self.dim {
                return Err(anyhow!(
                    "embedding has {} dimensions, expected {}",
                    vec.len(),
                    self.dim
                ));
            }
            embeddings.push(vec);
        }
        if embeddings.len() != texts.len() {
            return Err(anyhow!(
                "embeddings response has {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            ));
        }
        Ok(embeddings)
    }
}

/// Build the configured embedding provider. The OpenAI key comes from the
/// `OPENAI_API_KEY` environment variable, never from config files.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbedProvider>> {
    match settings.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(settings.dim))),
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                Error::InvalidConfig(
                    "embedding.provider = \"openai\" requires OPENAI_API_KEY".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                &settings.base_url,
                &api_key,
                &settings.model,
                settings.dim,
            )))
        }
        other => Err(Error::InvalidConfig(format!(
            "unknown embedding provider '{other}' (expected 'hash' or 'openai')"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let e = HashEmbedder::new(64);
        let a = e.embed_batch(&["portrait of a king".to_string()]).await.unwrap();
        let b = e.embed_batch(&["portrait of a king".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[tokio::test]
    async fn hash_embedder_output_is_unit_length() {
        let e = HashEmbedder::new(32);
        let v = &e.embed_batch(&["royal palace gardens".to_string()]).await.unwrap()[0];
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn hash_space_id_encodes_dimension() {
        assert_eq!(HashEmbedder::new(256).space_id(), "hash:xx64:d256");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = EmbeddingSettings {
            provider: "word2vec".to_string(),
            ..EmbeddingSettings::default()
        };
        assert!(embedder_from_settings(&settings).is_err());
    }
}
