//! Configuration loader and typed settings.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `MUSEA_*` env
//! vars, the same layering the rest of the workspace expects. `Settings`
//! extracts the whole recognized surface with defaults so a missing file
//! still yields a runnable configuration.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::types::FusionConfig;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("MUSEA_").split("__"));

        Ok(Self { figment })
    }

    /// Extract the full typed settings surface.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub fusion: FusionConfig,
    pub session: SessionSettings,
    pub generation: GenerationSettings,
    pub index: IndexSettings,
    pub prompts: PromptSettings,
}

/// Embedding capability. `space_id` must match the space the collection was
/// indexed with; the vector store enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `hash` (deterministic, offline) or `openai` (any OpenAI-compatible
    /// `/v1/embeddings` endpoint).
    pub provider: String,
    pub model: String,
    pub dim: usize,
    pub base_url: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: "text-embedding-3-large".to_string(),
            dim: 256,
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of question/answer turns kept per session (FIFO-evicted).
    pub window_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { window_size: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// `openai` (any OpenAI-compatible chat endpoint) or `ollama`.
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// LanceDB database directory.
    pub db_dir: String,
    /// tantivy index directory.
    pub text_dir: String,
    /// Collection (table) name holding the chunks.
    pub collection: String,
    /// Fixed ingestion batch size; each batch commits atomically.
    pub batch_size: usize,
    /// Subject-URL prefixes identifying image hosts in triple records.
    pub image_host_prefixes: Vec<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            db_dir: "./data/lancedb".to_string(),
            text_dir: "./data/tantivy".to_string(),
            collection: "musea".to_string(),
            batch_size: 100,
            image_host_prefixes: vec![
                "https://lib.is/".to_string(),
                "http://balat.kikirpa.be/image/thumbnail/".to_string(),
            ],
        }
    }
}

/// Instruction payloads passed verbatim to the generation capability. The
/// wording is deployment-owned; these defaults match the shipped assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// System prompt for answering. `{context}` is replaced with the
    /// grounding context built from the top fused chunks.
    pub system: String,
    /// System prompt for rewriting a follow-up question into a standalone
    /// one; the window is passed as chat history alongside it.
    pub contextualize: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            contextualize: DEFAULT_CONTEXTUALIZE_PROMPT.to_string(),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an artwork specialist. You must assist the users in finding, \
describing, and displaying artworks from the collection. You first have to search answers in the \"Knowledge \
Base\". If no answers are found in the \"Knowledge Base\", then answer with your own knowledge. You have to \
answer in the same language as the question.\n\nKnowledge Base:\n\n{context}";

pub const DEFAULT_CONTEXTUALIZE_PROMPT: &str = "Given a chat history and the latest user question which might \
reference context in the chat history, formulate a standalone question which can be understood without the \
chat history. Do NOT answer the question, just reformulate it if needed and otherwise return it as is.";

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
