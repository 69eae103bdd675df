//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_CHUNKING__MAX_TOKENS=256`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::retry::RetryPolicy;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load `config.toml` and the `RUST_ENV` overlay from `base`, then `APP_*`.
    pub fn load_from_dir(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(base.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like [`Config::get`] but a missing key is `None` rather than an error.
    pub fn get_opt<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.figment.contains(key) { self.get(key).map(Some) } else { Ok(None) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub min_chunk_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 512, overlap_tokens: 50, min_chunk_tokens: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::InvalidConfig("chunking.max_tokens must be > 0".into()));
        }
        if self.overlap_tokens >= self.max_tokens {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_tokens ({}) must be < max_tokens ({})",
                self.overlap_tokens, self.max_tokens
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results requested from each index before fusion.
    pub candidate_k: usize,
    pub top_k: usize,
    pub rrf_k: f64,
    /// Length (in chars) of the text prefix used as the fusion dedup key.
    pub dedup_prefix_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { candidate_k: 20, top_k: 5, rrf_k: 60.0, dedup_prefix_chars: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub api_base: String,
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".into(),
            dimension: 1536,
            batch_size: 100,
            max_attempts: 3,
            backoff_base_ms: 1000,
            api_base: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

impl EmbeddingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_base_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub api_base: String,
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: 0.1,
            max_tokens: 1000,
            max_attempts: 3,
            backoff_base_ms: 1000,
            api_base: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

impl CompletionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_base_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub bm25_index_path: String,
    pub dense_index_path: String,
    /// HuggingFace `tokenizer.json` used as the length metric, if set.
    pub tokenizer_path: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            bm25_index_path: "data/bm25_index.json".into(),
            dense_index_path: "data/dense_index.json".into(),
            tokenizer_path: None,
        }
    }
}

/// All typed sections; any section missing from the sources keeps its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
    pub data: DataConfig,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_config(&Config::load()?)
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = Self {
            chunking: config.get_opt("chunking")?.unwrap_or_default(),
            retrieval: config.get_opt("retrieval")?.unwrap_or_default(),
            embedding: config.get_opt("embedding")?.unwrap_or_default(),
            completion: config.get_opt("completion")?.unwrap_or_default(),
            data: config.get_opt("data")?.unwrap_or_default(),
        };
        settings.chunking.validate()?;
        Ok(settings)
    }

    /// Figment seeded with these settings, for layering overrides in tests.
    pub fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(self))
    }
}

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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
