//! Chat generators.
//!
//! Both talk JSON over HTTP: `OpenAiGenerator` to any OpenAI-compatible
//! `/v1/chat/completions` endpoint, `OllamaGenerator` to a local Ollama
//! daemon. The registry memoizes one client per (provider, model,
//! temperature) so repeated lookups share connections.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use musea_core::config::GenerationSettings;
use musea_core::traits::Generator;
use musea_core::types::ConversationTurn;
use musea_core::Error;

fn chat_messages(system: &str, history: &[ConversationTurn], user: &str) -> Vec<Value> {
    let mut messages = vec![json!({"role": "system", "content": system})];
    for turn in history {
        messages.push(json!({"role": "user", "content": turn.question}));
        messages.push(json!({"role": "assistant", "content": turn.answer}));
    }
    messages.push(json!({"role": "user", "content": user}));
    messages
}

pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    name: String,
}

impl OpenAiGenerator {
    pub fn new(base_url: &str, api_key: &str, model: &str, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            name: format!("openai:{model}"),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user: &str,
    ) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": chat_messages(system, history, user),
            "temperature": self.temperature,
            "stream": false,
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
            return Err(anyhow!("chat request failed ({status}): {text}"));
        }
        let payload: Value = res.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("chat response carried no message content"))
    }
}

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    name: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            name: format!("ollama:{model}"),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user: &str,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": chat_messages(system, history, user),
            "stream": false,
            "options": {"temperature": self.temperature},
        });
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("chat request failed ({status}): {text}"));
        }
        let payload: Value = res.json().await?;
        payload["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("chat response carried no message content"))
    }
}

/// Build the configured generator. The OpenAI key comes from the
/// `OPENAI_API_KEY` environment variable, never from config files.
pub fn generator_from_settings(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    match settings.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                Error::InvalidConfig(
                    "generation.provider = \"openai\" requires OPENAI_API_KEY".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiGenerator::new(
                &settings.base_url,
                &api_key,
                &settings.model,
                settings.temperature,
            )))
        }
        "ollama" => Ok(Arc::new(OllamaGenerator::new(
            &settings.base_url,
            &settings.model,
            settings.temperature,
        ))),
        other => Err(Error::InvalidConfig(format!(
            "unknown generation provider '{other}' (expected 'openai' or 'ollama')"
        ))
        .into()),
    }
}

/// Memoizes generators per (provider, model, temperature).
#[derive(Default)]
pub struct GeneratorRegistry {
    cache: Mutex<HashMap<String, Arc<dyn Generator>>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
        let key = format!(
            "{}:{}:{}",
            settings.provider, settings.model, settings.temperature
        );
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| anyhow!("generator registry lock poisoned"))?;
        if let Some(existing) = cache.get(&key) {
            return Ok(existing.clone());
        }
        let built = generator_from_settings(settings)?;
        cache.insert(key, built.clone());
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_replayed_as_alternating_roles() {
        let history = vec![
            ConversationTurn::new("q1", "a1"),
            ConversationTurn::new("q2", "a2"),
        ];
        let messages = chat_messages("sys", &history, "q3");
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "q1");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[5]["content"], "q3");
    }

    #[test]
    fn registry_memoizes_per_settings() {
        let registry = GeneratorRegistry::new();
        let settings = GenerationSettings {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            temperature: 0.0,
            base_url: "http://localhost:11434".to_string(),
        };
        let a = registry.get(&settings).unwrap();
        let b = registry.get(&settings).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = GenerationSettings {
            provider: "bard".to_string(),
            ..GenerationSettings::default()
        };
        assert!(generator_from_settings(&settings).is_err());
    }
}
