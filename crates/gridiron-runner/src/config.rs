//! Configuration for the LLM runner.
//!
//! All configuration is loaded from environment variables: which LLM
//! backends to use (primary plus optional shadow), the embeddings
//! provider, the per-call deadline, and the expert concurrency cap.

use std::time::Duration;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Primary LLM backend configuration.
    pub primary_backend: LlmBackendConfig,
    /// Shadow LLM backend, run in parallel off the hot path.
    pub shadow_backend: Option<LlmBackendConfig>,
    /// Embeddings provider configuration.
    pub embeddings: Option<EmbeddingsConfig>,
    /// Maximum time allowed for one bundle generation (LLM call plus
    /// parsing). Violations count against the eligibility gate.
    pub generation_timeout: Duration,
    /// Maximum number of experts predicting concurrently.
    pub max_parallel_experts: usize,
    /// Path to the prompt templates directory.
    pub templates_dir: String,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai-compatible or anthropic).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API.
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

/// Configuration for the embeddings provider.
#[derive(Debug, Clone)]
pub struct EmbeddingsConfig {
    /// Base API URL.
    pub api_url: String,
    /// API key.
    pub api_key: String,
    /// Embedding model identifier.
    pub model: String,
}

/// Default generation deadline in milliseconds (the latency SLO).
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 6_000;

/// Default expert concurrency cap.
pub const DEFAULT_MAX_PARALLEL_EXPERTS: usize = 8;

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_PRIMARY_BACKEND` -- primary backend type
    /// - `LLM_PRIMARY_API_URL` -- primary API base URL
    /// - `LLM_PRIMARY_API_KEY` -- primary API key
    /// - `LLM_PRIMARY_MODEL` -- primary model name
    ///
    /// Optional variables:
    /// - `LLM_SHADOW_BACKEND` / `_API_URL` / `_API_KEY` / `_MODEL` --
    ///   the shadow backend (enabled when all four are present)
    /// - `EMBEDDINGS_API_URL` / `EMBEDDINGS_API_KEY` /
    ///   `EMBEDDINGS_MODEL` -- the embeddings provider
    /// - `GENERATION_TIMEOUT_MS` -- bundle deadline (default 6000)
    /// - `MAX_PARALLEL_EXPERTS` -- concurrency cap (default 8)
    /// - `TEMPLATES_DIR` -- prompt templates path (default `templates`)
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] on missing or malformed values.
    pub fn from_env() -> Result<Self, RunnerError> {
        let primary_backend = load_backend_config("LLM_PRIMARY")?;
        let shadow_backend = load_backend_config("LLM_SHADOW").ok();

        let embeddings = load_embeddings_config().ok();

        let generation_timeout_ms: u64 = std::env::var("GENERATION_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_GENERATION_TIMEOUT_MS.to_string())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid GENERATION_TIMEOUT_MS: {e}")))?;

        let max_parallel_experts: usize = std::env::var("MAX_PARALLEL_EXPERTS")
            .unwrap_or_else(|_| DEFAULT_MAX_PARALLEL_EXPERTS.to_string())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid MAX_PARALLEL_EXPERTS: {e}")))?;

        let templates_dir =
            std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| String::from("templates"));

        Ok(Self {
            primary_backend,
            shadow_backend,
            embeddings,
            generation_timeout: Duration::from_millis(generation_timeout_ms),
            max_parallel_experts: max_parallel_experts.max(1),
            templates_dir,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}

/// Load an LLM backend config from prefixed environment variables.
fn load_backend_config(prefix: &str) -> Result<LlmBackendConfig, RunnerError> {
    let backend_str = env_var(&format!("{prefix}_BACKEND"))?;
    let api_url = env_var(&format!("{prefix}_API_URL"))?;
    let api_key = env_var(&format!("{prefix}_API_KEY"))?;
    let model = env_var(&format!("{prefix}_MODEL"))?;

    let backend_type = match backend_str.to_lowercase().as_str() {
        "openai" | "deepseek" | "ollama" => BackendType::OpenAi,
        "anthropic" | "claude" => BackendType::Anthropic,
        other => {
            return Err(RunnerError::Config(format!(
                "unknown backend type: {other}"
            )));
        }
    };

    Ok(LlmBackendConfig {
        backend_type,
        api_url,
        api_key,
        model,
    })
}

/// Load the embeddings config from environment variables.
fn load_embeddings_config() -> Result<EmbeddingsConfig, RunnerError> {
    Ok(EmbeddingsConfig {
        api_url: env_var("EMBEDDINGS_API_URL")?,
        api_key: env_var("EMBEDDINGS_API_KEY")?,
        model: env_var("EMBEDDINGS_MODEL")?,
    })
}
