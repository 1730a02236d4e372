//! The learning coordinator: turning settled outcomes into change.
//!
//! After settlement every prediction is scored:
//!
//! ```text
//! score = 0.4*winner + 0.3*spread_component + 0.3*total_component
//! ```
//!
//! where the spread and total components decay linearly with error and
//! zero out at 14 and 20 points respectively. The score then drives
//! three things:
//!
//! 1. **Weight updates** -- each reasoning-chain factor moves by
//!    `(score - 0.5) * learning_rate * factor_weight`, bounded to [0, 1],
//!    bumping the profile version.
//! 2. **A memory write** -- emotional state from the fixed
//!    (score, confidence error) table, vividness scaled by the memory
//!    type, decay starting at 1.0.
//! 3. **Peer learning** -- exceptional results (score above 0.7 or below
//!    0.3) broadcast `(factors, outcome, score)` and nothing else; each
//!    receiving expert decides by personality whether to incorporate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gridiron_types::{
    EmotionalState, EpisodicMemory, ExpertId, GameOutcome, LearningEvent, LearningEventId,
    LearningEventKind, MemoryId, MemoryType, PersonalityProfile, PredictionBundle,
    QueuePriority, ReasoningChain, RunId,
};

use gridiron_experts::Reflection;

/// Spread error at which the spread component zeroes.
pub const SPREAD_ERROR_CEILING: f64 = 14.0;

/// Total error at which the total component zeroes.
pub const TOTAL_ERROR_CEILING: f64 = 20.0;

/// Score above which a result is an exceptional hit.
pub const EXCEPTIONAL_HIT: f64 = 0.7;

/// Score below which a result is a catastrophic miss.
pub const CATASTROPHIC_MISS: f64 = 0.3;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// The per-prediction outcome score and its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningScore {
    /// Winner component in {0, 0.5, 1}.
    pub winner_component: f64,
    /// Spread component in [0, 1].
    pub spread_component: f64,
    /// Total component in [0, 1].
    pub total_component: f64,
    /// The blended score in [0, 1].
    pub total: f64,
}

/// Score a settled prediction.
pub fn score_prediction(bundle: &PredictionBundle, outcome: &GameOutcome) -> LearningScore {
    let winner_component = match outcome.winner() {
        Some(side) if side == bundle.winner.pick => 1.0,
        Some(_) => 0.0,
        // Ties grade the winner call at half credit.
        None => 0.5,
    };

    let actual_margin = f64::from(outcome.margin_home());
    let spread_error = (bundle.margin.margin_home - actual_margin).abs();
    let spread_component = (1.0 - spread_error / SPREAD_ERROR_CEILING).clamp(0.0, 1.0);

    let actual_total = f64::from(outcome.total());
    let total_error = (bundle.total.total - actual_total).abs();
    let total_component = (1.0 - total_error / TOTAL_ERROR_CEILING).clamp(0.0, 1.0);

    LearningScore {
        winner_component,
        spread_component,
        total_component,
        total: 0.4 * winner_component + 0.3 * spread_component + 0.3 * total_component,
    }
}

// ---------------------------------------------------------------------------
// Emotional state table
// ---------------------------------------------------------------------------

/// The fixed (score, confidence error) to emotional state table.
pub fn emotional_state_for(score: f64, confidence_error: f64) -> EmotionalState {
    if score >= 0.8 {
        if confidence_error <= 0.3 {
            EmotionalState::Euphoria
        } else {
            // Right result, but the expert did not see it coming.
            EmotionalState::Surprise
        }
    } else if score >= 0.6 {
        EmotionalState::Satisfaction
    } else if score >= 0.4 {
        EmotionalState::Neutral
    } else if confidence_error > 0.5 {
        EmotionalState::Devastation
    } else if score >= 0.2 {
        EmotionalState::Disappointment
    } else {
        EmotionalState::Confusion
    }
}

// ---------------------------------------------------------------------------
// Weight updates
// ---------------------------------------------------------------------------

/// One factor's applied adjustment, for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAdjustment {
    /// The adjusted factor.
    pub factor: String,
    /// The signed adjustment applied (pre-clamp).
    pub adjustment: f64,
}

/// Apply the outcome score to the expert's factor weights.
///
/// Every chain factor moves by `(score - 0.5) * learning_rate * weight`;
/// the profile clamps each weight to [0, 1] and bumps its version once
/// per adjusted factor.
pub fn apply_weight_updates(
    profile: &mut PersonalityProfile,
    chain: &ReasoningChain,
    score: &LearningScore,
) -> Vec<WeightAdjustment> {
    let mut applied = Vec::new();
    for factor in &chain.factors {
        if factor.weight <= 0.0 {
            continue;
        }
        let adjustment = (score.total - 0.5) * profile.learning_rate * factor.weight;
        profile.apply_factor_adjustment(&factor.name, adjustment);
        applied.push(WeightAdjustment {
            factor: factor.name.clone(),
            adjustment,
        });
    }
    tracing::debug!(
        expert_id = %profile.expert_id,
        adjustments = applied.len(),
        score = score.total,
        version = profile.version,
        "factor weights updated"
    );
    applied
}

// ---------------------------------------------------------------------------
// Memory construction
// ---------------------------------------------------------------------------

/// Build the episodic memory a settled prediction leaves behind.
///
/// Memory type follows the score: exceptional hits stay plain prediction
/// outcomes (or upset detections when the expert beat its own market
/// lean), catastrophic misses become failure analyses, everything else a
/// learning moment. Vividness is emotional intensity scaled by the
/// type multiplier; decay always starts at 1.0.
pub fn build_memory(
    run_id: RunId,
    bundle: &PredictionBundle,
    outcome: &GameOutcome,
    score: &LearningScore,
    reflection: &Reflection,
    now: DateTime<Utc>,
) -> EpisodicMemory {
    let emotional_state = emotional_state_for(score.total, reflection.confidence_error);

    let memory_type = if score.total < CATASTROPHIC_MISS {
        MemoryType::FailureAnalysis
    } else if score.total > EXCEPTIONAL_HIT {
        if bundle.winner.win_probability_home < 0.5 && score.winner_component >= 1.0 {
            MemoryType::UpsetDetection
        } else {
            MemoryType::PredictionOutcome
        }
    } else {
        MemoryType::LearningMoment
    };

    let emotional_intensity = emotional_state.intensity();
    let vividness = (emotional_intensity * memory_type.vividness_multiplier()).clamp(0.0, 1.0);

    EpisodicMemory {
        memory_id: MemoryId::derive(bundle.expert_id, bundle.game_id, now),
        expert_id: bundle.expert_id,
        game_id: bundle.game_id,
        run_id,
        memory_type,
        emotional_state,
        prediction_summary: format!(
            "picked {:?} at {:.0}% confidence, margin {:+.1}, total {:.1}",
            bundle.winner.pick,
            bundle.overall_confidence * 100.0,
            bundle.margin.margin_home,
            bundle.total.total
        ),
        outcome_summary: format!(
            "final {}-{} (margin {:+}, total {})",
            outcome.home_score,
            outcome.away_score,
            outcome.margin_home(),
            outcome.total()
        ),
        contextual_factors: bundle.factor_names(),
        lessons_learned: reflection.lessons.clone(),
        emotional_intensity,
        vividness,
        decay: 1.0,
        retrieval_count: 0,
        content_embedding: None,
        context_embedding: None,
        combined_embedding: None,
        created_at: now,
    }
}

// ---------------------------------------------------------------------------
// Learning events and peer learning
// ---------------------------------------------------------------------------

/// Queue priority for a settled-prediction event.
pub fn settlement_priority(score: f64) -> QueuePriority {
    if score < CATASTROPHIC_MISS {
        QueuePriority::VeryHigh
    } else if score > EXCEPTIONAL_HIT {
        QueuePriority::High
    } else {
        QueuePriority::Normal
    }
}

/// Build the settled-prediction learning event.
pub fn settlement_event(
    run_id: RunId,
    bundle: &PredictionBundle,
    score: &LearningScore,
    confidence_error: f64,
    now: DateTime<Utc>,
) -> LearningEvent {
    LearningEvent {
        event_id: LearningEventId::new(),
        run_id,
        expert_id: bundle.expert_id,
        game_id: bundle.game_id,
        kind: LearningEventKind::SettledPrediction {
            prediction_id: bundle.prediction_id,
            score: score.total,
            confidence_error,
        },
        priority: settlement_priority(score.total),
        created_at: now,
    }
}

/// Whether a scored result should broadcast to peers.
pub fn is_peer_candidate(score: f64) -> bool {
    score > EXCEPTIONAL_HIT || score < CATASTROPHIC_MISS
}

/// Build the peer broadcast events for every *other* expert.
///
/// The broadcast carries factors, outcome, and score only -- never the
/// source expert's methodology. Targets are addressed by ID; the queue
/// consumer resolves IDs to live profiles at drain time.
pub fn peer_broadcast_events(
    run_id: RunId,
    source: &PredictionBundle,
    score: &LearningScore,
    edge: Option<f64>,
    targets: &[ExpertId],
    now: DateTime<Utc>,
) -> Vec<LearningEvent> {
    if !is_peer_candidate(score.total) {
        return Vec::new();
    }
    targets
        .iter()
        .filter(|t| **t != source.expert_id)
        .map(|target| LearningEvent {
            event_id: LearningEventId::new(),
            run_id,
            expert_id: *target,
            game_id: source.game_id,
            kind: LearningEventKind::PeerBroadcast {
                source_expert: source.expert_id,
                factors: source.factor_names(),
                won: score.winner_component >= 1.0,
                score: score.total,
                edge,
            },
            priority: QueuePriority::Medium,
            created_at: now,
        })
        .collect()
}

/// Decide how (and whether) a receiving expert incorporates a broadcast.
///
/// Personality decides:
/// - contrarians (trait above 0.7) learn the *inverse* from failures
/// - consensus followers (trait below 0.3) learn from winning calls
/// - value seekers (risk tolerance above 0.7) learn from high-edge wins
///
/// Returns the factor adjustments to apply, or an empty list when the
/// personality ignores the broadcast.
pub fn incorporate_peer_broadcast(
    profile: &PersonalityProfile,
    factors: &[String],
    won: bool,
    score: f64,
    edge: Option<f64>,
) -> Vec<WeightAdjustment> {
    let contrarian = profile.traits.contrarianism > 0.7;
    let follower = profile.traits.contrarianism < 0.3;
    let value_seeker = profile.traits.risk_tolerance > 0.7;

    // Peer lessons land at half the expert's own learning rate.
    let rate = profile.learning_rate * 0.5;

    let delta = if contrarian && score < CATASTROPHIC_MISS {
        // A peer's failure is a signal to weight those factors *up*
        // for the inverse read.
        (0.5 - score) * rate
    } else if follower && won && score > EXCEPTIONAL_HIT {
        (score - 0.5) * rate
    } else if value_seeker && won && edge.is_some_and(|e| e >= 0.05) {
        (score - 0.5) * rate
    } else {
        return Vec::new();
    };

    factors
        .iter()
        .map(|factor| WeightAdjustment {
            factor: factor.clone(),
            adjustment: delta,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use gridiron_types::bundle::{
        Assertion, Factor, MarginCall, SpreadCall, TotalCall, WinnerCall,
    };
    use gridiron_types::{
        AccessFlags, Archetype, BundleStatus, ExpertStatus, GameId, PersonalityTraits,
        PickSide, PredictionId, ReasoningFactor, SnapshotId,
    };
    use std::collections::BTreeMap;

    use super::*;

    fn bundle(pick: PickSide, margin: f64, total: f64, confidence: f64) -> PredictionBundle {
        let assertion = Assertion {
            confidence,
            reasoning: String::from("test"),
            factors: vec![Factor {
                name: String::from("momentum"),
                weight: 1.0,
                confidence: 0.6,
            }],
        };
        PredictionBundle {
            prediction_id: PredictionId::new(),
            expert_id: ExpertId::new(),
            game_id: GameId::new(),
            snapshot_id: SnapshotId::new(),
            profile_version: 1,
            status: BundleStatus::Generated,
            winner: WinnerCall {
                pick,
                win_probability_home: if pick == PickSide::Home { 0.6 } else { 0.4 },
                win_probability_away: if pick == PickSide::Home { 0.4 } else { 0.6 },
                assertion: assertion.clone(),
            },
            spread: SpreadCall {
                spread_home: -margin,
                assertion: assertion.clone(),
            },
            total: TotalCall {
                total,
                assertion: assertion.clone(),
            },
            margin: MarginCall {
                margin_home: margin,
                assertion,
            },
            periods: Vec::new(),
            team_stats: Vec::new(),
            player_props: Vec::new(),
            situational: Vec::new(),
            overall_confidence: confidence,
            created_at: Utc::now(),
        }
    }

    fn outcome(home: u16, away: u16) -> GameOutcome {
        GameOutcome {
            game_id: GameId::new(),
            home_score: home,
            away_score: away,
        }
    }

    fn profile(contrarianism: f64, risk: f64) -> PersonalityProfile {
        PersonalityProfile {
            expert_id: ExpertId::new(),
            name: String::from("test"),
            archetype: Archetype::Scholar,
            traits: PersonalityTraits {
                risk_tolerance: risk,
                contrarianism,
                optimism: 0.5,
                recency_bias: 0.5,
                analytics_trust: 0.5,
            },
            access: AccessFlags::all(),
            factor_weights: BTreeMap::new(),
            learning_rate: 0.10,
            version: 1,
            status: ExpertStatus::Active,
        }
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    #[test]
    fn perfect_call_scores_one() {
        // Home by 7, total 47: exactly right.
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let s = score_prediction(&b, &outcome(27, 20));
        assert!((s.total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spread_component_zeroes_at_fourteen() {
        // Margin off by exactly 14.
        let b = bundle(PickSide::Home, 21.0, 47.0, 0.7);
        let s = score_prediction(&b, &outcome(27, 20));
        assert!(s.spread_component.abs() < 1e-9);
    }

    #[test]
    fn total_component_zeroes_at_twenty() {
        let b = bundle(PickSide::Home, 7.0, 67.0, 0.7);
        let s = score_prediction(&b, &outcome(27, 20));
        assert!(s.total_component.abs() < 1e-9);
    }

    #[test]
    fn wrong_pick_loses_winner_component() {
        let b = bundle(PickSide::Away, 7.0, 47.0, 0.7);
        let s = score_prediction(&b, &outcome(27, 20));
        assert!(s.winner_component.abs() < 1e-9);
        // Spread and total still earn their components.
        assert!((s.total - 0.6).abs() < 1e-9);
    }

    #[test]
    fn tie_gives_half_winner_credit() {
        let b = bundle(PickSide::Home, 0.0, 42.0, 0.6);
        let s = score_prediction(&b, &outcome(21, 21));
        assert!((s.winner_component - 0.5).abs() < 1e-9);
    }

    #[test]
    fn components_decay_linearly() {
        // Margin off by 7 of 14: half credit.
        let b = bundle(PickSide::Home, 14.0, 47.0, 0.7);
        let s = score_prediction(&b, &outcome(27, 20));
        assert!((s.spread_component - 0.5).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Emotional table
    // -----------------------------------------------------------------------

    #[test]
    fn emotional_table_corners() {
        assert_eq!(emotional_state_for(0.9, 0.1), EmotionalState::Euphoria);
        assert_eq!(emotional_state_for(0.9, 0.6), EmotionalState::Surprise);
        assert_eq!(emotional_state_for(0.65, 0.2), EmotionalState::Satisfaction);
        assert_eq!(emotional_state_for(0.5, 0.2), EmotionalState::Neutral);
        assert_eq!(emotional_state_for(0.25, 0.7), EmotionalState::Devastation);
        assert_eq!(emotional_state_for(0.25, 0.2), EmotionalState::Disappointment);
        assert_eq!(emotional_state_for(0.1, 0.2), EmotionalState::Confusion);
    }

    // -----------------------------------------------------------------------
    // Weight updates
    // -----------------------------------------------------------------------

    fn chain_for(bundle: &PredictionBundle) -> ReasoningChain {
        ReasoningChain {
            prediction_id: bundle.prediction_id,
            expert_id: bundle.expert_id,
            game_id: bundle.game_id,
            factors: vec![ReasoningFactor {
                name: String::from("momentum"),
                weight: 1.0,
                confidence: 0.6,
            }],
            monologue: String::from("test"),
            dominant_factors: vec![String::from("momentum")],
            confidence_breakdown: Vec::new(),
            final_confidence: 0.6,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn good_score_raises_factor_weights() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let chain = chain_for(&b);
        let mut p = profile(0.5, 0.5);
        let score = score_prediction(&b, &outcome(27, 20));

        let before = p.factor_weight("momentum");
        let applied = apply_weight_updates(&mut p, &chain, &score);
        assert_eq!(applied.len(), 1);
        assert!(p.factor_weight("momentum") > before);
        assert_eq!(p.version, 2);
    }

    #[test]
    fn bad_score_lowers_factor_weights() {
        let b = bundle(PickSide::Away, -20.0, 80.0, 0.9);
        let chain = chain_for(&b);
        let mut p = profile(0.5, 0.5);
        let score = score_prediction(&b, &outcome(27, 20));
        assert!(score.total < 0.5);

        let before = p.factor_weight("momentum");
        let _ = apply_weight_updates(&mut p, &chain, &score);
        assert!(p.factor_weight("momentum") < before);
    }

    #[test]
    fn adjustment_magnitude_follows_formula() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let chain = chain_for(&b);
        let mut p = profile(0.5, 0.5);
        let score = score_prediction(&b, &outcome(27, 20));

        let applied = apply_weight_updates(&mut p, &chain, &score);
        let expected = (score.total - 0.5) * 0.10 * 1.0;
        assert!(applied
            .first()
            .is_some_and(|a| (a.adjustment - expected).abs() < 1e-12));
    }

    // -----------------------------------------------------------------------
    // Memory construction
    // -----------------------------------------------------------------------

    fn reflection_for(b: &PredictionBundle, error: f64) -> Reflection {
        Reflection {
            expert_id: b.expert_id,
            game_id: b.game_id,
            emotional_state: EmotionalState::Neutral,
            lessons: vec![String::from("test lesson")],
            confidence_error: error,
            minimal: false,
        }
    }

    #[test]
    fn memory_starts_fully_vivid_and_undecayed() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let score = score_prediction(&b, &outcome(27, 20));
        let memory = build_memory(
            RunId::new(),
            &b,
            &outcome(27, 20),
            &score,
            &reflection_for(&b, 0.1),
            Utc::now(),
        );
        assert!((memory.decay - 1.0).abs() < f64::EPSILON);
        assert!((0.0..=1.0).contains(&memory.vividness));
        assert_eq!(memory.retrieval_count, 0);
    }

    #[test]
    fn catastrophic_miss_becomes_failure_analysis() {
        let b = bundle(PickSide::Away, -20.0, 80.0, 0.9);
        let score = score_prediction(&b, &outcome(27, 20));
        assert!(score.total < CATASTROPHIC_MISS);
        let memory = build_memory(
            RunId::new(),
            &b,
            &outcome(27, 20),
            &score,
            &reflection_for(&b, 0.6),
            Utc::now(),
        );
        assert_eq!(memory.memory_type, MemoryType::FailureAnalysis);
    }

    #[test]
    fn memory_id_is_deterministic_over_inputs() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let score = score_prediction(&b, &outcome(27, 20));
        let now = Utc::now();
        let r = reflection_for(&b, 0.1);
        let m1 = build_memory(RunId::new(), &b, &outcome(27, 20), &score, &r, now);
        let m2 = build_memory(RunId::new(), &b, &outcome(27, 20), &score, &r, now);
        assert_eq!(m1.memory_id, m2.memory_id);
    }

    // -----------------------------------------------------------------------
    // Priorities and peer learning
    // -----------------------------------------------------------------------

    #[test]
    fn priorities_follow_score_bands() {
        assert_eq!(settlement_priority(0.1), QueuePriority::VeryHigh);
        assert_eq!(settlement_priority(0.9), QueuePriority::High);
        assert_eq!(settlement_priority(0.5), QueuePriority::Normal);
    }

    #[test]
    fn middling_scores_do_not_broadcast() {
        assert!(!is_peer_candidate(0.5));
        assert!(is_peer_candidate(0.8));
        assert!(is_peer_candidate(0.2));
    }

    #[test]
    fn broadcast_excludes_the_source() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let score = score_prediction(&b, &outcome(27, 20));
        let targets = vec![b.expert_id, ExpertId::new(), ExpertId::new()];
        let events =
            peer_broadcast_events(RunId::new(), &b, &score, Some(0.06), &targets, Utc::now());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.expert_id != b.expert_id));
        assert!(events.iter().all(|e| e.priority == QueuePriority::Medium));
    }

    #[test]
    fn broadcast_never_carries_methodology() {
        let b = bundle(PickSide::Home, 7.0, 47.0, 0.7);
        let score = score_prediction(&b, &outcome(27, 20));
        let events = peer_broadcast_events(
            RunId::new(),
            &b,
            &score,
            None,
            &[ExpertId::new()],
            Utc::now(),
        );
        let carries_only_allowed = events.iter().all(|e| {
            matches!(
                &e.kind,
                LearningEventKind::PeerBroadcast { factors, .. } if !factors.is_empty()
            )
        });
        assert!(carries_only_allowed);
    }

    #[test]
    fn contrarian_learns_inverse_from_failures() {
        let p = profile(0.9, 0.5);
        let adjustments = incorporate_peer_broadcast(
            &p,
            &[String::from("momentum")],
            false,
            0.1,
            None,
        );
        assert!(adjustments.first().is_some_and(|a| a.adjustment > 0.0));
    }

    #[test]
    fn follower_learns_from_winning_calls() {
        let p = profile(0.1, 0.5);
        let adjustments = incorporate_peer_broadcast(
            &p,
            &[String::from("momentum")],
            true,
            0.9,
            None,
        );
        assert!(adjustments.first().is_some_and(|a| a.adjustment > 0.0));
    }

    #[test]
    fn value_seeker_needs_edge() {
        let p = profile(0.5, 0.9);
        let without_edge =
            incorporate_peer_broadcast(&p, &[String::from("momentum")], true, 0.9, None);
        assert!(without_edge.is_empty());

        let with_edge =
            incorporate_peer_broadcast(&p, &[String::from("momentum")], true, 0.9, Some(0.08));
        assert!(!with_edge.is_empty());
    }

    #[test]
    fn neutral_personality_ignores_broadcasts() {
        let p = profile(0.5, 0.5);
        let adjustments =
            incorporate_peer_broadcast(&p, &[String::from("momentum")], true, 0.9, Some(0.08));
        assert!(adjustments.is_empty());
    }
}
