//! Core entity structs shared across the workspace.
//!
//! Covers the expert personality profile, episodic memories, belief
//! revisions, reasoning chains, bankrolls, virtual bets, game outcomes,
//! learning events, and run metadata. Domain logic (retrieval scoring,
//! Kelly sizing, settlement) lives in the owning crates; these are the
//! records that cross crate boundaries and land in the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enums::{
    Archetype, BetCategory, BetSelection, BetStatus, EliminationRisk, EmotionalState,
    ExpertStatus, MemoryType, PickSide, QueuePriority, RevisionTrigger, RevisionType,
};
use crate::ids::{
    BetId, ExpertId, GameId, LearningEventId, MemoryId, PredictionId, RevisionId, RunId,
};

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Immutable trait vector assigned at season start.
///
/// Each trait is in [0, 1]. Traits shape which UDV sections the expert
/// reads and how its monologue sounds, and they never change; learning
/// only moves the factor weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    /// Appetite for variance; scales bet sizing via the archetype.
    pub risk_tolerance: f64,
    /// Tendency to fade consensus.
    pub contrarianism: f64,
    /// Baseline optimism applied to close calls.
    pub optimism: f64,
    /// How heavily recent games outweigh the season body of work.
    pub recency_bias: f64,
    /// Trust in advanced metrics over narrative.
    pub analytics_trust: f64,
}

/// Which UDV sections an expert's personality lets it read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFlags {
    /// Team aggregate statistics.
    pub stats: bool,
    /// Bookmaker market lines.
    pub odds: bool,
    /// Kickoff weather.
    pub weather: bool,
    /// Injury designations.
    pub injuries: bool,
    /// Head-to-head and tendency history.
    pub historical: bool,
    /// Public betting and sentiment.
    pub public_betting: bool,
}

impl AccessFlags {
    /// Flags with every section visible.
    pub const fn all() -> Self {
        Self {
            stats: true,
            odds: true,
            weather: true,
            injuries: true,
            historical: true,
            public_betting: true,
        }
    }
}

/// Learning-rate floor for any expert.
pub const MIN_LEARNING_RATE: f64 = 0.02;

/// Learning-rate ceiling for any expert.
pub const MAX_LEARNING_RATE: f64 = 0.20;

/// Neutral learned factor weight (multiplier 1.0).
pub const NEUTRAL_FACTOR_WEIGHT: f64 = 0.5;

/// An expert's full personality profile.
///
/// Traits and access flags are immutable for the life of the run. The
/// learned factor weights are the only thing the learning coordinator
/// moves, and every move bumps `version` so predictions can pin the
/// profile they were made under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// The owning expert.
    pub expert_id: ExpertId,
    /// Display name.
    pub name: String,
    /// Sizing archetype.
    pub archetype: Archetype,
    /// Immutable trait vector.
    pub traits: PersonalityTraits,
    /// Immutable section access flags.
    pub access: AccessFlags,
    /// Learned per-factor weights in [0, 1]; absent factors read as
    /// [`NEUTRAL_FACTOR_WEIGHT`].
    pub factor_weights: BTreeMap<String, f64>,
    /// Online learning rate in [[`MIN_LEARNING_RATE`], [`MAX_LEARNING_RATE`]].
    pub learning_rate: f64,
    /// Monotonic version, incremented on every weight change.
    pub version: u32,
    /// Lifecycle status.
    pub status: ExpertStatus,
}

impl PersonalityProfile {
    /// The learned weight for a factor, defaulting to neutral.
    pub fn factor_weight(&self, factor: &str) -> f64 {
        self.factor_weights
            .get(factor)
            .copied()
            .unwrap_or(NEUTRAL_FACTOR_WEIGHT)
    }

    /// The calibration multiplier for a factor.
    ///
    /// A learned weight of 0.5 is neutral (multiplier 1.0); the full
    /// weight range [0, 1] maps to multipliers in [0.5, 1.5].
    pub fn factor_multiplier(&self, factor: &str) -> f64 {
        0.5 + self.factor_weight(factor)
    }

    /// Apply a learning adjustment to one factor, clamped to [0, 1],
    /// bumping the profile version.
    pub fn apply_factor_adjustment(&mut self, factor: &str, adjustment: f64) {
        let current = self.factor_weight(factor);
        let updated = (current + adjustment).clamp(0.0, 1.0);
        self.factor_weights.insert(String::from(factor), updated);
        self.version = self.version.saturating_add(1);
    }

    /// Clamp a raw learning rate into the permitted band.
    pub fn clamp_learning_rate(raw: f64) -> f64 {
        raw.clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE)
    }
}

// ---------------------------------------------------------------------------
// Episodic memory
// ---------------------------------------------------------------------------

/// One past-game experience owned by an expert.
///
/// Append-only: once stored, only `decay` and `retrieval_count` ever
/// change. The ID is deterministic over (expert, game, `created_at`), so
/// re-storing the same memory is detectable and rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicMemory {
    /// Deterministic memory ID.
    pub memory_id: MemoryId,
    /// The owning expert.
    pub expert_id: ExpertId,
    /// The game the memory is about.
    pub game_id: GameId,
    /// The run this memory belongs to.
    pub run_id: RunId,
    /// Memory category.
    pub memory_type: MemoryType,
    /// Emotional state when the memory formed.
    pub emotional_state: EmotionalState,
    /// Snapshot of the prediction the memory is about.
    pub prediction_summary: String,
    /// What actually happened.
    pub outcome_summary: String,
    /// Contextual factors in play at the time.
    pub contextual_factors: Vec<String>,
    /// Lessons the expert drew.
    pub lessons_learned: Vec<String>,
    /// Emotional intensity in [0, 1].
    pub emotional_intensity: f64,
    /// Vividness in [0, 1] (intensity scaled by the memory-type multiplier).
    pub vividness: f64,
    /// Decay in [0, 1]; 1.0 at formation, reduced by the decay batch.
    pub decay: f64,
    /// How many times retrieval has returned this memory.
    pub retrieval_count: u32,
    /// Embedding of the memory content (1536-dim), if available.
    pub content_embedding: Option<Vec<f32>>,
    /// Embedding of the contextual factors, if available.
    pub context_embedding: Option<Vec<f32>>,
    /// Combined embedding used by similarity retrieval, if available.
    pub combined_embedding: Option<Vec<f32>>,
    /// When the memory was formed.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reasoning chain
// ---------------------------------------------------------------------------

/// One weighted factor inside a reasoning chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningFactor {
    /// Factor name.
    pub name: String,
    /// Weight in [0, 1].
    pub weight: f64,
    /// Per-factor confidence in [0, 1].
    pub confidence: f64,
}

/// Confidence broken down by bet category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfidence {
    /// The bet category.
    pub category: BetCategory,
    /// Confidence for that category.
    pub confidence: f64,
}

/// The audit record derived from a prediction bundle at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    /// The prediction this chain explains.
    pub prediction_id: PredictionId,
    /// The predicting expert.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// Ordered factors, highest weight first.
    pub factors: Vec<ReasoningFactor>,
    /// Personality-flavored monologue derived from the dominant factor.
    pub monologue: String,
    /// The factors that dominated the call.
    pub dominant_factors: Vec<String>,
    /// Confidence by bet category.
    pub confidence_breakdown: Vec<CategoryConfidence>,
    /// Aggregate confidence: sum of weight x confidence over weighted factors.
    pub final_confidence: f64,
    /// When the chain was written.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Belief revision
// ---------------------------------------------------------------------------

/// One step in a revision's causal chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalStep {
    /// The UDV section that changed, if the step came from a snapshot delta.
    pub section: Option<crate::enums::UdvSection>,
    /// Human-readable summary of the change.
    pub summary: String,
    /// When the change was observed.
    pub observed_at: DateTime<Utc>,
}

/// A classified change between two sequential predictions.
///
/// Immutable once created. Classification is deterministic: recomputing
/// from the same two bundles returns the identical type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefRevision {
    /// Row identifier.
    pub revision_id: RevisionId,
    /// The run.
    pub run_id: RunId,
    /// The expert whose belief changed.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// Classification of the change.
    pub revision_type: RevisionType,
    /// Inferred cause.
    pub trigger: RevisionTrigger,
    /// The prediction being revised.
    pub original_prediction: PredictionId,
    /// The revising prediction.
    pub revised_prediction: PredictionId,
    /// Ordered causal steps reconstructed from the UDV delta.
    pub causal_chain: Vec<CausalStep>,
    /// Signed change in overall confidence.
    pub confidence_delta: f64,
    /// Normalized impact in [0, 1].
    pub impact_score: f64,
    /// Emotional state attached to the revision.
    pub emotional_state: EmotionalState,
    /// When the revision was detected.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bankroll and bets
// ---------------------------------------------------------------------------

/// An expert's virtual bankroll within a run.
///
/// Mutated only on the settlement path. `current_units` never goes
/// negative; `active` flips false exactly when it reaches zero, and never
/// flips back within the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bankroll {
    /// The owning expert.
    pub expert_id: ExpertId,
    /// The run.
    pub run_id: RunId,
    /// Starting units (constant for the run).
    pub starting_units: Decimal,
    /// Current units (stakes of pending bets are held out in
    /// `pending_stakes`, not here).
    pub current_units: Decimal,
    /// High-water mark.
    pub peak_units: Decimal,
    /// Units currently escrowed in pending bets.
    pub pending_stakes: Decimal,
    /// Cumulative units staked across settled bets.
    pub total_staked: Decimal,
    /// Cumulative realized profit/loss across settled bets.
    pub total_profit: Decimal,
    /// Total bets settled.
    pub total_bets: u32,
    /// Bets settled as wins.
    pub winning_bets: u32,
    /// Return on investment over all settled stakes.
    pub roi: Decimal,
    /// Whether the expert may still place bets.
    pub active: bool,
    /// When the bankroll hit zero, if it did.
    pub eliminated_at: Option<DateTime<Utc>>,
}

impl Bankroll {
    /// A fresh bankroll at season start.
    pub fn fresh(expert_id: ExpertId, run_id: RunId, starting_units: Decimal) -> Self {
        Self {
            expert_id,
            run_id,
            starting_units,
            current_units: starting_units,
            peak_units: starting_units,
            pending_stakes: Decimal::ZERO,
            total_staked: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            total_bets: 0,
            winning_bets: 0,
            roi: Decimal::ZERO,
            active: true,
            eliminated_at: None,
        }
    }

    /// `current / starting` as a float ratio for risk banding.
    pub fn ratio(&self) -> f64 {
        if self.starting_units <= Decimal::ZERO {
            return 0.0;
        }
        self.current_units
            .checked_div(self.starting_units)
            .and_then(|ratio| ratio.to_f64())
            .unwrap_or(0.0)
    }

    /// Current elimination risk band.
    pub fn risk_level(&self) -> EliminationRisk {
        EliminationRisk::from_ratio(self.ratio())
    }
}

/// A sized wager placed from a confident prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualBet {
    /// Row identifier.
    pub bet_id: BetId,
    /// The run.
    pub run_id: RunId,
    /// The betting expert.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// Market category.
    pub category: BetCategory,
    /// What the bet backs.
    pub selection: BetSelection,
    /// The line the bet was placed against, if the market has one
    /// (spread and total markets do; the winner market does not).
    pub line: Option<f64>,
    /// Stated confidence when the bet was placed.
    pub confidence: f64,
    /// American odds at placement.
    pub american_odds: i32,
    /// Stake in bankroll units.
    pub stake: Decimal,
    /// Bookmaker implied probability at placement.
    pub implied_probability: f64,
    /// Edge (confidence minus implied probability).
    pub edge: f64,
    /// Raw Kelly fraction before personality scaling.
    pub kelly_fraction: f64,
    /// Archetype multiplier applied to the Kelly fraction.
    pub personality_multiplier: f64,
    /// Profit if the bet wins.
    pub potential_payout: Decimal,
    /// Lifecycle status.
    pub status: BetStatus,
    /// Realized profit or loss after settlement (zero while pending).
    pub realized_payout: Decimal,
    /// Bankroll before the stake was debited.
    pub bankroll_before: Decimal,
    /// Bankroll after settlement (equal to before while pending).
    pub bankroll_after: Decimal,
    /// Why the expert made this bet.
    pub reasoning: String,
    /// When the bet was placed.
    pub placed_at: DateTime<Utc>,
    /// When the bet settled, if it has.
    pub settled_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Game outcome
// ---------------------------------------------------------------------------

/// The final result of a game, used for settlement and learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// The game.
    pub game_id: GameId,
    /// Final home score.
    pub home_score: u16,
    /// Final away score.
    pub away_score: u16,
}

impl GameOutcome {
    /// The winning side, or `None` on a tie.
    pub const fn winner(&self) -> Option<PickSide> {
        if self.home_score > self.away_score {
            Some(PickSide::Home)
        } else if self.away_score > self.home_score {
            Some(PickSide::Away)
        } else {
            None
        }
    }

    /// Final margin, home minus away.
    pub fn margin_home(&self) -> i32 {
        i32::from(self.home_score).saturating_sub(i32::from(self.away_score))
    }

    /// Combined final score.
    pub fn total(&self) -> u32 {
        u32::from(self.home_score).saturating_add(u32::from(self.away_score))
    }
}

// ---------------------------------------------------------------------------
// Learning events
// ---------------------------------------------------------------------------

/// Payload of a queued learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningEventKind {
    /// A settled prediction to learn from.
    SettledPrediction {
        /// The settled prediction.
        prediction_id: PredictionId,
        /// Composite outcome score in [0, 1].
        score: f64,
        /// Absolute confidence error on the winner call.
        confidence_error: f64,
    },
    /// A peer-learning broadcast. Carries factors, outcome, and score
    /// only -- never methodology.
    PeerBroadcast {
        /// The broadcasting expert.
        source_expert: ExpertId,
        /// Factor names behind the source call.
        factors: Vec<String>,
        /// Whether the source call won.
        won: bool,
        /// The source call's outcome score.
        score: f64,
        /// The edge the source call was placed at, if it was bet.
        edge: Option<f64>,
    },
}

/// One event on the learning queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    /// Row identifier.
    pub event_id: LearningEventId,
    /// The run.
    pub run_id: RunId,
    /// The expert this event targets.
    pub expert_id: ExpertId,
    /// The game that produced the event.
    pub game_id: GameId,
    /// Event payload.
    pub kind: LearningEventKind,
    /// Queue priority band.
    pub priority: QueuePriority,
    /// When the event was enqueued.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Run metadata
// ---------------------------------------------------------------------------

/// Metadata for one experiment run.
///
/// Records the configuration the run started under, including the
/// canonical archetype-naming choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// The run.
    pub run_id: RunId,
    /// NFL season the run covers.
    pub season: u16,
    /// Starting bankroll per expert.
    pub starting_units: Decimal,
    /// Concurrency cap on parallel expert predictions.
    pub max_parallel_experts: usize,
    /// Whether the shadow LLM backend is enabled.
    pub shadow_enabled: bool,
    /// Whether post-game reflection LLM calls are enabled.
    pub reflection_enabled: bool,
    /// Which archetype naming convention this run uses.
    pub archetype_naming: String,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PersonalityProfile {
        PersonalityProfile {
            expert_id: ExpertId::new(),
            name: String::from("The Scholar"),
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
            learning_rate: 0.08,
            version: 1,
            status: ExpertStatus::Active,
        }
    }

    #[test]
    fn unknown_factor_reads_neutral() {
        let p = profile();
        assert!((p.factor_weight("momentum") - NEUTRAL_FACTOR_WEIGHT).abs() < f64::EPSILON);
        assert!((p.factor_multiplier("momentum") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn factor_adjustment_bumps_version_and_clamps() {
        let mut p = profile();
        p.apply_factor_adjustment("momentum", 0.9);
        assert_eq!(p.version, 2);
        assert!((p.factor_weight("momentum") - 1.0).abs() < f64::EPSILON);

        p.apply_factor_adjustment("momentum", -5.0);
        assert_eq!(p.version, 3);
        assert!(p.factor_weight("momentum").abs() < f64::EPSILON);
    }

    #[test]
    fn learning_rate_clamped_to_band() {
        assert!((PersonalityProfile::clamp_learning_rate(0.5) - MAX_LEARNING_RATE).abs()
            < f64::EPSILON);
        assert!((PersonalityProfile::clamp_learning_rate(0.0) - MIN_LEARNING_RATE).abs()
            < f64::EPSILON);
        assert!((PersonalityProfile::clamp_learning_rate(0.1) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn fresh_bankroll_starts_whole() {
        let b = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(100, 0));
        assert!(b.active);
        assert_eq!(b.current_units, b.starting_units);
        assert_eq!(b.peak_units, b.starting_units);
        assert!((b.ratio() - 1.0).abs() < f64::EPSILON);
        assert_eq!(b.risk_level(), EliminationRisk::Safe);
    }

    #[test]
    fn bankroll_risk_bands_follow_ratio() {
        let mut b = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(100, 0));
        b.current_units = Decimal::new(50, 0);
        assert_eq!(b.risk_level(), EliminationRisk::Warning);
        b.current_units = Decimal::new(20, 0);
        assert_eq!(b.risk_level(), EliminationRisk::Danger);
        b.current_units = Decimal::new(10, 0);
        assert_eq!(b.risk_level(), EliminationRisk::Critical);
    }

    #[test]
    fn outcome_winner_and_margin() {
        let outcome = GameOutcome {
            game_id: GameId::new(),
            home_score: 27,
            away_score: 20,
        };
        assert_eq!(outcome.winner(), Some(PickSide::Home));
        assert_eq!(outcome.margin_home(), 7);
        assert_eq!(outcome.total(), 47);
    }

    #[test]
    fn tie_has_no_winner() {
        let outcome = GameOutcome {
            game_id: GameId::new(),
            home_score: 21,
            away_score: 21,
        };
        assert_eq!(outcome.winner(), None);
        assert_eq!(outcome.margin_home(), 0);
    }

    #[test]
    fn learning_event_kind_serializes_tagged() {
        let kind = LearningEventKind::PeerBroadcast {
            source_expert: ExpertId::new(),
            factors: vec![String::from("momentum")],
            won: true,
            score: 0.8,
            edge: Some(0.05),
        };
        let json = serde_json::to_string(&kind).unwrap_or_default();
        assert!(json.contains("\"kind\":\"peer_broadcast\""));
    }
}
