//! LLM orchestration for the Gridiron Council platform.
//!
//! The runner owns the hot path from "a round needs bundles" to "each
//! expert has a validated bundle or an explicit failure":
//!
//! - [`config`] -- environment-driven backend and concurrency settings
//! - [`prompt`] -- `minijinja` templates loaded from `templates/`
//! - [`llm`] -- `OpenAI`-compatible and Anthropic backends over `reqwest`
//! - [`parse`] -- LLM JSON to schema-valid bundles (hard reject boundary)
//! - [`orchestrator`] -- semaphore-bounded concurrent generation with
//!   per-call deadlines
//! - [`shadow`] -- parallel alternate-backend runs, stored separately,
//!   never on the hot path
//! - [`embeddings`] -- the 1536-dim embeddings client
//! - [`cost`] -- per-expert spend tracking in `Decimal`

pub mod config;
pub mod cost;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod shadow;

// Re-export primary types at crate root.
pub use config::{BackendType, EmbeddingsConfig, LlmBackendConfig, RunnerConfig};
pub use cost::CostTracker;
pub use embeddings::{EMBEDDING_DIM, EmbeddingsClient, combine_embeddings};
pub use error::RunnerError;
pub use llm::{LlmBackend, create_backend};
pub use orchestrator::LlmOrchestrator;
pub use parse::{BundleContext, parse_bundle};
pub use prompt::{PromptEngine, RenderedPrompt};
pub use shadow::{ShadowResult, spawn_shadow};
