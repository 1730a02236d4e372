//! Shadow backend execution.
//!
//! A shadow run sends the same rendered prompt to an alternate LLM
//! backend in parallel with the primary call. Shadow results are stored
//! separately for offline comparison and *never* affect the hot path:
//! the task is detached, its failures are logged and swallowed, and the
//! primary result never waits on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use gridiron_types::{ExpertId, GameId};

use crate::llm::LlmBackend;
use crate::prompt::RenderedPrompt;

/// The stored outcome of one shadow call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowResult {
    /// The expert whose prompt was shadowed.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// The shadow model identifier.
    pub model: String,
    /// Raw response text, if the call succeeded.
    pub response: Option<String>,
    /// Error description, if it failed.
    pub error: Option<String>,
    /// Wall-clock call time in milliseconds.
    pub elapsed_ms: u64,
    /// When the shadow call completed.
    pub completed_at: DateTime<Utc>,
}

/// Fire a shadow call without blocking the hot path.
///
/// The result (success or failure) is sent to `sink`; a full or closed
/// sink drops the result with a log line rather than propagating any
/// error to the caller.
pub fn spawn_shadow(
    backend: std::sync::Arc<LlmBackend>,
    prompt: RenderedPrompt,
    expert_id: ExpertId,
    game_id: GameId,
    sink: mpsc::Sender<ShadowResult>,
) {
    tokio::spawn(async move {
        let started = std::time::Instant::now();
        let model = backend.model().to_owned();
        let outcome = backend.complete(&prompt).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(response) => ShadowResult {
                expert_id,
                game_id,
                model,
                response: Some(response),
                error: None,
                elapsed_ms,
                completed_at: Utc::now(),
            },
            Err(e) => {
                tracing::debug!(
                    expert_id = %expert_id,
                    game_id = %game_id,
                    error = %e,
                    "shadow call failed (hot path unaffected)"
                );
                ShadowResult {
                    expert_id,
                    game_id,
                    model,
                    response: None,
                    error: Some(e.to_string()),
                    elapsed_ms,
                    completed_at: Utc::now(),
                }
            }
        };

        if sink.try_send(result).is_err() {
            tracing::debug!("shadow sink full or closed; result dropped");
        }
    });
}
