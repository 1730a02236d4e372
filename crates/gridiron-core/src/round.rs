//! The per-game prediction round and transactional game settlement.
//!
//! A round presents every active expert with its filtered view and
//! retrieved memories and collects one bundle (or an explicit failure)
//! per expert. The [`PredictionSource`] trait abstracts where bundles
//! come from -- the LLM runner on the hot path, the deterministic
//! heuristic agent in tests and as the validation fallback. The trait is
//! the *blocking* entry point; cooperative sources run their own
//! concurrency internally (the runner bounds parallel LLM calls with a
//! semaphore) and block here only to hand results back.
//!
//! Failures never corrupt a round: an expert whose generation failed is
//! recorded as such, penalized at the eligibility gate, and excluded
//! from consensus while the other experts proceed.
//!
//! Game settlement is all-or-nothing: every pending bet for the game
//! settles and every touched bankroll updates, or the whole settlement
//! returns an error and nothing is kept. The database layer wraps the
//! result in one transaction. Settling an already-settled game is a
//! no-op.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};

use gridiron_bank::{apply_settlement, settle_bet};
use gridiron_experts::{
    EligibilityGate, ExpertAgent, FilteredView, GateSample, ReasoningLog, ScoredMemory,
    build_chain,
};
use gridiron_types::{
    Bankroll, BetStatus, BundleStatus, ExpertId, GameOutcome, PersonalityProfile,
    PredictionBundle, ReasoningChain, VirtualBet,
};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Prediction round
// ---------------------------------------------------------------------------

/// Everything one expert needs to predict one game.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// The expert's profile, version pinned for this round.
    pub profile: PersonalityProfile,
    /// The personality-filtered view.
    pub view: FilteredView,
    /// Retrieved memories, ranked.
    pub memories: Vec<ScoredMemory>,
    /// Determinism seed for the numeric skeleton.
    pub seed: u64,
}

/// One expert's result for the round.
#[derive(Debug, Clone)]
pub enum PredictOutcome {
    /// A schema-valid bundle and its reasoning chain.
    Generated {
        /// The bundle.
        bundle: Box<PredictionBundle>,
        /// The derived reasoning chain.
        chain: Box<ReasoningChain>,
        /// Generation time in milliseconds.
        elapsed_ms: u64,
    },
    /// Generation failed (timeout or schema reject).
    Failed {
        /// The failing expert.
        expert_id: ExpertId,
        /// Why generation failed.
        reason: String,
        /// Time spent before failing, in milliseconds.
        elapsed_ms: u64,
    },
}

/// A source of prediction bundles.
///
/// Implementations produce one [`PredictOutcome`] per request. Individual
/// expert failures are handled by returning [`PredictOutcome::Failed`]
/// for that expert -- never by failing the whole collection.
pub trait PredictionSource {
    /// Collect one outcome per request.
    fn collect(&mut self, requests: &[PredictRequest]) -> BTreeMap<ExpertId, PredictOutcome>;
}

/// The deterministic heuristic source.
///
/// Drives [`ExpertAgent::predict`] synchronously. Used by property tests
/// and as the fallback when LLM output is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSource;

impl HeuristicSource {
    /// Create a heuristic source.
    pub const fn new() -> Self {
        Self
    }
}

impl PredictionSource for HeuristicSource {
    fn collect(&mut self, requests: &[PredictRequest]) -> BTreeMap<ExpertId, PredictOutcome> {
        let mut outcomes = BTreeMap::new();
        for request in requests {
            let expert_id = request.profile.expert_id;
            let started = Instant::now();
            let agent = ExpertAgent::new(request.profile.clone());
            let outcome = match agent.predict(&request.view, &request.memories, request.seed) {
                Ok(bundle) => {
                    let elapsed_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    match bundle.validate_schema() {
                        Ok(()) => {
                            let chain = build_chain(&bundle, &request.profile);
                            PredictOutcome::Generated {
                                bundle: Box::new(bundle),
                                chain: Box::new(chain),
                                elapsed_ms,
                            }
                        }
                        Err(errors) => PredictOutcome::Failed {
                            expert_id,
                            reason: format!("schema validation failed: {errors}"),
                            elapsed_ms,
                        },
                    }
                }
                Err(e) => PredictOutcome::Failed {
                    expert_id,
                    reason: e.to_string(),
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                },
            };
            outcomes.insert(expert_id, outcome);
        }
        outcomes
    }
}

/// The collected result of one prediction round.
#[derive(Debug, Default)]
pub struct RoundResult {
    /// Schema-valid bundles, one per successful expert.
    pub bundles: Vec<PredictionBundle>,
    /// Experts whose generation failed, with reasons.
    pub failures: Vec<(ExpertId, String)>,
}

/// Run one prediction round through a source.
///
/// Every outcome feeds the expert's eligibility gate (valid + latency);
/// successful chains land in the reasoning log. Failures are returned
/// for recording as [`BundleStatus::GenerationFailed`] rows.
///
/// # Errors
///
/// Returns [`CoreError`] only if the reasoning log was closed mid-round;
/// per-expert failures are data, not errors.
pub fn run_round(
    source: &mut dyn PredictionSource,
    requests: &[PredictRequest],
    gates: &mut BTreeMap<ExpertId, EligibilityGate>,
    log: &mut ReasoningLog,
) -> Result<RoundResult, CoreError> {
    let outcomes = source.collect(requests);
    let mut result = RoundResult::default();

    for (expert_id, outcome) in outcomes {
        match outcome {
            PredictOutcome::Generated {
                bundle,
                chain,
                elapsed_ms,
            } => {
                if let Some(gate) = gates.get_mut(&expert_id) {
                    gate.record(GateSample {
                        schema_valid: true,
                        response_ms: elapsed_ms,
                    });
                }
                log.append(*chain)?;
                debug_assert_eq!(bundle.status, BundleStatus::Generated);
                result.bundles.push(*bundle);
            }
            PredictOutcome::Failed {
                expert_id,
                reason,
                elapsed_ms,
            } => {
                if let Some(gate) = gates.get_mut(&expert_id) {
                    gate.record(GateSample {
                        schema_valid: false,
                        response_ms: elapsed_ms,
                    });
                }
                tracing::warn!(
                    expert_id = %expert_id,
                    reason = %reason,
                    "bundle generation failed; expert excluded from consensus"
                );
                result.failures.push((expert_id, reason));
            }
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Game settlement
// ---------------------------------------------------------------------------

/// The in-memory result of settling one game.
#[derive(Debug, Clone)]
pub struct GameSettlement {
    /// Every bet after settlement (already-settled bets unchanged).
    pub settled_bets: Vec<VirtualBet>,
    /// Every touched bankroll, post-settlement.
    pub bankrolls: BTreeMap<ExpertId, Bankroll>,
}

/// Settle all of a game's bets against the outcome.
///
/// Pure and all-or-nothing: the caller's bankrolls are cloned, every
/// pending bet settles against its owner's clone, and either the whole
/// [`GameSettlement`] comes back or an error does. Already-settled bets
/// pass through untouched, which makes the operation idempotent.
///
/// # Errors
///
/// Returns [`CoreError::InvariantBreach`] if a bet's owner has no
/// bankroll; propagates [`CoreError::Bank`] on grading or arithmetic
/// failures.
pub fn settle_game(
    bets: &[VirtualBet],
    outcome: &GameOutcome,
    bankrolls: &BTreeMap<ExpertId, Bankroll>,
    now: DateTime<Utc>,
) -> Result<GameSettlement, CoreError> {
    let mut updated_bankrolls = bankrolls.clone();
    let mut settled_bets = Vec::with_capacity(bets.len());

    for bet in bets {
        if bet.status != BetStatus::Pending {
            settled_bets.push(bet.clone());
            continue;
        }

        let settled = settle_bet(bet, outcome, now)?;
        let bankroll = updated_bankrolls.get_mut(&bet.expert_id).ok_or_else(|| {
            CoreError::InvariantBreach(format!("no bankroll for expert {}", bet.expert_id))
        })?;
        apply_settlement(bankroll, &settled, now)?;
        settled_bets.push(settled);
    }

    Ok(GameSettlement {
        settled_bets,
        bankrolls: updated_bankrolls,
    })
}
