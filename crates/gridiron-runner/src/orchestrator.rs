//! The cooperative prediction orchestrator.
//!
//! This is the hot-path counterpart of the core crate's blocking
//! [`gridiron_core::PredictionSource`]: per game, every expert's LLM
//! call runs as its own task, bounded by a semaphore at
//! `max_parallel_experts`, each under the generation deadline. A timeout
//! or schema reject becomes [`PredictOutcome::Failed`] -- an eligibility
//! penalty, never a corrupt bundle -- and the other experts proceed.
//!
//! When a shadow backend is configured the same rendered prompt is fired
//! at it in parallel; shadow results flow to their own sink and never
//! touch these outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};

use gridiron_core::{PredictOutcome, PredictRequest};
use gridiron_experts::build_chain;
use gridiron_types::bundle::{PROP_KEYS, SITUATIONAL_KEYS, TEAM_STAT_KEYS};
use gridiron_types::ExpertId;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, create_backend};
use crate::parse::{BundleContext, parse_bundle};
use crate::prompt::PromptEngine;
use crate::shadow::{ShadowResult, spawn_shadow};

/// Drives concurrent LLM bundle generation for a round.
pub struct LlmOrchestrator {
    backend: Arc<LlmBackend>,
    shadow: Option<Arc<LlmBackend>>,
    shadow_sink: Option<mpsc::Sender<ShadowResult>>,
    prompts: Arc<PromptEngine>,
    semaphore: Arc<Semaphore>,
    timeout: std::time::Duration,
}

impl LlmOrchestrator {
    /// Build an orchestrator from runner configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if the prompt templates fail to
    /// load.
    pub fn new(
        config: &RunnerConfig,
        shadow_sink: Option<mpsc::Sender<ShadowResult>>,
    ) -> Result<Self, RunnerError> {
        let prompts = Arc::new(PromptEngine::new(&config.templates_dir)?);
        let backend = Arc::new(create_backend(&config.primary_backend));
        let shadow = config
            .shadow_backend
            .as_ref()
            .map(|c| Arc::new(create_backend(c)));

        Ok(Self {
            backend,
            shadow,
            shadow_sink,
            prompts,
            semaphore: Arc::new(Semaphore::new(config.max_parallel_experts)),
            timeout: config.generation_timeout,
        })
    }

    /// Generate one outcome per request, concurrently.
    ///
    /// Individual failures never abort the round; each expert's slot in
    /// the returned map is filled either way.
    pub async fn generate_all(
        &self,
        requests: Vec<PredictRequest>,
    ) -> BTreeMap<ExpertId, PredictOutcome> {
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let backend = Arc::clone(&self.backend);
            let shadow = self.shadow.clone();
            let shadow_sink = self.shadow_sink.clone();
            let prompts = Arc::clone(&self.prompts);
            let semaphore = Arc::clone(&self.semaphore);
            let timeout = self.timeout;

            handles.push(tokio::spawn(async move {
                let expert_id = request.profile.expert_id;
                // Holding the permit bounds concurrent LLM calls; a
                // closed semaphore (shutdown) lets the call proceed to
                // fail fast on its own.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome =
                    generate_one(&backend, shadow, shadow_sink, &prompts, &request, timeout)
                        .await;
                (expert_id, outcome)
            }));
        }

        let mut outcomes = BTreeMap::new();
        for handle in handles {
            if let Ok((expert_id, outcome)) = handle.await {
                outcomes.insert(expert_id, outcome);
            }
        }
        outcomes
    }
}

/// One expert's guarded generation attempt.
async fn generate_one(
    backend: &LlmBackend,
    shadow: Option<Arc<LlmBackend>>,
    shadow_sink: Option<mpsc::Sender<ShadowResult>>,
    prompts: &PromptEngine,
    request: &PredictRequest,
    timeout: std::time::Duration,
) -> PredictOutcome {
    let expert_id = request.profile.expert_id;
    let started = Instant::now();

    let failed = |reason: String, started: Instant| PredictOutcome::Failed {
        expert_id,
        reason,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    let context = prompt_context(request);
    let prompt = match prompts.render(&context) {
        Ok(prompt) => prompt,
        Err(e) => return failed(e.to_string(), started),
    };

    // The shadow fires on the same prompt, off the hot path.
    if let (Some(shadow), Some(sink)) = (shadow, shadow_sink) {
        spawn_shadow(shadow, prompt.clone(), expert_id, request.view.game_id, sink);
    }

    let deadline_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let response = match tokio::time::timeout(timeout, backend.complete(&prompt)).await {
        Err(_) => {
            return failed(
                RunnerError::Timeout { deadline_ms }.to_string(),
                started,
            );
        }
        Ok(Err(e)) => return failed(e.to_string(), started),
        Ok(Ok(response)) => response,
    };

    let bundle_context = BundleContext {
        expert_id,
        game_id: request.view.game_id,
        snapshot_id: request.view.snapshot_id,
        profile_version: request.profile.version,
    };

    match parse_bundle(&response, bundle_context) {
        Ok(bundle) => {
            let chain = build_chain(&bundle, &request.profile);
            PredictOutcome::Generated {
                bundle: Box::new(bundle),
                chain: Box::new(chain),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }
        }
        Err(e) => failed(e.to_string(), started),
    }
}

/// Serialize one request into the prompt template context.
fn prompt_context(request: &PredictRequest) -> serde_json::Value {
    let memories: Vec<&gridiron_types::EpisodicMemory> =
        request.memories.iter().map(|m| &m.memory).collect();

    serde_json::json!({
        "expert_name": request.profile.name,
        "archetype": request.profile.archetype,
        "traits": request.profile.traits,
        "home_team": request.view.home_team,
        "away_team": request.view.away_team,
        "market": request.view.market,
        "weather": request.view.weather,
        "injuries": request.view.injuries,
        "stats": request.view.stats,
        "historical": request.view.historical,
        "news": request.view.news,
        "memories": memories,
        "memory_count": memories.len(),
        "team_stat_keys": TEAM_STAT_KEYS.join(", "),
        "prop_keys": PROP_KEYS.join(", "),
        "situational_keys": SITUATIONAL_KEYS.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gridiron_experts::filter_view;
    use gridiron_types::{
        AccessFlags, Archetype, ExpertStatus, GameId, PersonalityProfile, PersonalityTraits,
        SectionSlot, SnapshotId, UniversalGameData,
    };

    use super::*;

    fn test_profile() -> PersonalityProfile {
        PersonalityProfile {
            expert_id: ExpertId::new(),
            name: String::from("The Professor"),
            archetype: Archetype::Scholar,
            traits: PersonalityTraits {
                risk_tolerance: 0.4,
                contrarianism: 0.3,
                optimism: 0.5,
                recency_bias: 0.4,
                analytics_trust: 0.9,
            },
            access: AccessFlags::all(),
            factor_weights: BTreeMap::new(),
            learning_rate: 0.05,
            version: 1,
            status: ExpertStatus::Active,
        }
    }

    fn request() -> PredictRequest {
        let udv = UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id: GameId::new(),
            snapshot_time: chrono::Utc::now(),
            home_team: String::from("KC"),
            away_team: String::from("BUF"),
            kickoff: chrono::Utc::now(),
            venue: String::from("Arrowhead Stadium"),
            market: SectionSlot::absent(),
            weather: SectionSlot::absent(),
            injuries: SectionSlot::absent(),
            stats: SectionSlot::absent(),
            historical: SectionSlot::absent(),
            news: SectionSlot::absent(),
        };
        let profile = test_profile();
        let view = filter_view(&udv, &profile);
        PredictRequest {
            profile,
            view,
            memories: Vec::new(),
            seed: 1,
        }
    }

    #[test]
    fn prompt_context_carries_identity_and_schema_keys() {
        let context = prompt_context(&request());
        assert_eq!(
            context.get("home_team").and_then(|v| v.as_str()),
            Some("KC")
        );
        assert!(context
            .get("team_stat_keys")
            .and_then(|v| v.as_str())
            .is_some_and(|s| s.contains("rush_yards")));
        assert!(context
            .get("situational_keys")
            .and_then(|v| v.as_str())
            .is_some_and(|s| s.contains("overtime")));
    }

    #[test]
    fn prompt_context_reflects_hidden_sections() {
        let context = prompt_context(&request());
        // All sections absent in the fixture: template sees nulls.
        assert!(context.get("market").is_some_and(serde_json::Value::is_null));
    }
}
