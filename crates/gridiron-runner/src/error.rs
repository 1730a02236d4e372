//! Error types for the LLM runner.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! pipeline: configuration, prompt rendering, backend calls, response
//! parsing, and embeddings.

/// Errors that can occur during LLM orchestration.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be parsed into a valid bundle.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The parsed bundle failed schema validation (hard reject).
    #[error("schema validation failed: {0}")]
    SchemaReject(String),

    /// The generation deadline was exceeded.
    #[error("timeout: bundle generation exceeded {deadline_ms}ms")]
    Timeout {
        /// The deadline that was exceeded.
        deadline_ms: u64,
    },

    /// The embeddings provider failed or returned the wrong dimension.
    #[error("embeddings error: {0}")]
    Embeddings(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
