//! Enumeration types for the Gridiron Council platform.
//!
//! Covers expert lifecycle, memory taxonomy, belief revision taxonomy,
//! bet lifecycle, bankroll risk bands, and the UDV section tags used for
//! presence flags and revision-trigger inference.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Expert lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of an expert within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertStatus {
    /// The expert predicts, bets, and may sit on the council.
    Active,
    /// The expert's bankroll reached zero; no further bets this run.
    Eliminated,
}

/// Personality archetype assigned to an expert at season start.
///
/// The archetype names here are the canonical set for the whole platform
/// (recorded per run in run metadata as `archetype_naming = "table-v1"`).
/// Unknown archetype strings parse to [`Archetype::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Aggressive sizing, chases variance.
    Gambler,
    /// Fades the public, takes contrarian positions.
    Rebel,
    /// Deliberate, research-driven.
    Scholar,
    /// Deep in one category, shallow elsewhere.
    Specialist,
    /// Model-driven, moderate sizing.
    Analyst,
    /// Long track record, cautious sizing.
    Veteran,
    /// First season, small sizing.
    Rookie,
    /// Capital preservation first.
    Conservative,
    /// Fallback archetype for anything unrecognized.
    Default,
}

impl Archetype {
    /// Parse an archetype name leniently.
    ///
    /// Case-insensitive; anything unrecognized maps to [`Self::Default`]
    /// rather than failing, so a malformed profile never blocks a run.
    pub fn parse_lenient(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "gambler" => Self::Gambler,
            "rebel" => Self::Rebel,
            "scholar" => Self::Scholar,
            "specialist" => Self::Specialist,
            "analyst" => Self::Analyst,
            "veteran" => Self::Veteran,
            "rookie" => Self::Rookie,
            "conservative" => Self::Conservative,
            _ => Self::Default,
        }
    }
}

// ---------------------------------------------------------------------------
// Episodic memory taxonomy
// ---------------------------------------------------------------------------

/// Category of an episodic memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A settled prediction and its result.
    PredictionOutcome,
    /// The expert called (or missed) an upset.
    UpsetDetection,
    /// A lesson distilled from reflection.
    LearningMoment,
    /// A recurring situational pattern the expert noticed.
    PatternRecognition,
    /// Post-mortem of a badly missed call.
    FailureAnalysis,
    /// The expert diverged from the council consensus.
    ConsensusDeviation,
}

impl MemoryType {
    /// Vividness multiplier applied when the memory is formed.
    ///
    /// Failures and upsets imprint harder than routine outcomes.
    pub const fn vividness_multiplier(self) -> f64 {
        match self {
            Self::PredictionOutcome => 1.0,
            Self::UpsetDetection => 1.3,
            Self::LearningMoment => 1.1,
            Self::PatternRecognition => 1.05,
            Self::FailureAnalysis => 1.4,
            Self::ConsensusDeviation => 1.2,
        }
    }
}

/// Emotional state attached to a memory or revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    /// High-confidence call landed big.
    Euphoria,
    /// Solid call, solid result.
    Satisfaction,
    /// Nothing notable either way.
    Neutral,
    /// Wrong, but within reason.
    Disappointment,
    /// High-confidence call missed badly.
    Devastation,
    /// Low-confidence call landed.
    Surprise,
    /// The result contradicts the expert's model of the game.
    Confusion,
    /// A contrarian call the field mocked came in.
    Vindication,
}

impl EmotionalState {
    /// Base emotional intensity in [0, 1] for vividness computation.
    pub const fn intensity(self) -> f64 {
        match self {
            Self::Euphoria | Self::Devastation => 0.95,
            Self::Vindication => 0.85,
            Self::Surprise | Self::Confusion => 0.7,
            Self::Satisfaction | Self::Disappointment => 0.55,
            Self::Neutral => 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Belief revision taxonomy
// ---------------------------------------------------------------------------

/// Classification of a change between two sequential predictions for the
/// same (expert, game). Variants are ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionType {
    /// The top-level pick flipped sides.
    CompleteReversal,
    /// A large numeric move (spread > 7 or total > 10).
    PredictionChange,
    /// Confidence moved by more than 0.2.
    ConfidenceShift,
    /// The factor list was rewritten (edit distance > 3).
    ReasoningUpdate,
    /// A scalar drifted by more than 10% of its prior value.
    NuancedAdjustment,
}

impl RevisionType {
    /// Severity weight in [0, 1] used by the impact score.
    pub const fn severity(self) -> f64 {
        match self {
            Self::CompleteReversal => 1.0,
            Self::PredictionChange => 0.8,
            Self::ConfidenceShift => 0.6,
            Self::ReasoningUpdate => 0.4,
            Self::NuancedAdjustment => 0.2,
        }
    }
}

/// What caused a belief revision, inferred from the UDV snapshot delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionTrigger {
    /// A section changed but no more specific trigger applies.
    NewInformation,
    /// The injuries section changed.
    InjuryReport,
    /// The weather section changed.
    WeatherUpdate,
    /// The market section changed.
    LineMovement,
    /// The news/sentiment section changed.
    PublicSentiment,
    /// A peer-learning broadcast moved the expert.
    ExpertInfluence,
    /// No section changed between the two snapshots.
    SelfReflection,
    /// The expert's own pattern matching fired.
    PatternRecognition,
}

// ---------------------------------------------------------------------------
// Bets and bankroll
// ---------------------------------------------------------------------------

/// Lifecycle status of a virtual bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    /// Placed, awaiting the game outcome.
    Pending,
    /// Settled as a win.
    Won,
    /// Settled as a loss.
    Lost,
    /// Settled as a push (stake refunded).
    Push,
}

/// Market category a bet (or prediction assertion) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetCategory {
    /// Straight winner (moneyline).
    Winner,
    /// Against the spread.
    Spread,
    /// Over/under on the combined score.
    Total,
    /// Margin of victory band.
    Margin,
    /// Quarter or half scoring split.
    PeriodSplit,
    /// Team statistical line.
    TeamStat,
    /// Player proposition.
    PlayerProp,
    /// Situational event (first score type, overtime, etc.).
    Situational,
}

/// What a bet backs within its market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetSelection {
    /// A team side (winner and spread markets).
    Side(PickSide),
    /// Over the line (total market).
    Over,
    /// Under the line (total market).
    Under,
}

/// Bankroll risk band derived from `current_units / starting_units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationRisk {
    /// Above 70% of starting units.
    Safe,
    /// Between 40% and 70%.
    Warning,
    /// Between 15% and 40%.
    Danger,
    /// At or below 15%.
    Critical,
}

impl EliminationRisk {
    /// Classify a bankroll ratio (`current / starting`) into a risk band.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 0.7 {
            Self::Safe
        } else if ratio > 0.4 {
            Self::Warning
        } else if ratio > 0.15 {
            Self::Danger
        } else {
            Self::Critical
        }
    }
}

// ---------------------------------------------------------------------------
// Predictions and picks
// ---------------------------------------------------------------------------

/// Which side of a game a pick refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickSide {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

impl PickSide {
    /// The opposite side.
    pub const fn flipped(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

/// Outcome of a bundle generation attempt.
///
/// A failed generation (LLM timeout or schema reject) is recorded so the
/// expert's eligibility gate sees it, but never enters consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    /// The bundle validated and was stored.
    Generated,
    /// The LLM call timed out or the output failed schema validation.
    GenerationFailed,
}

/// Player injury designation from the injuries adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    /// Ruled out.
    Out,
    /// Doubtful to play.
    Doubtful,
    /// Questionable to play.
    Questionable,
    /// Probable to play.
    Probable,
    /// Active, no designation.
    Active,
}

// ---------------------------------------------------------------------------
// UDV sections
// ---------------------------------------------------------------------------

/// Tag for one section of the Universal Data View.
///
/// Used for presence flags, staleness thresholds, and mapping a snapshot
/// delta to a [`RevisionTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UdvSection {
    /// Spreads, moneylines, totals.
    Market,
    /// Forecast at kickoff.
    Weather,
    /// Injury designations.
    Injuries,
    /// Rolling and season team aggregates.
    Stats,
    /// Head-to-head and play-by-play tendencies.
    Historical,
    /// News and public sentiment summaries.
    News,
}

impl UdvSection {
    /// The revision trigger implied by a change in this section.
    pub const fn trigger(self) -> RevisionTrigger {
        match self {
            Self::Market => RevisionTrigger::LineMovement,
            Self::Weather => RevisionTrigger::WeatherUpdate,
            Self::Injuries => RevisionTrigger::InjuryReport,
            Self::News => RevisionTrigger::PublicSentiment,
            Self::Stats | Self::Historical => RevisionTrigger::NewInformation,
        }
    }
}

// ---------------------------------------------------------------------------
// Learning queue
// ---------------------------------------------------------------------------

/// Priority band for queued learning events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    /// Routine settled prediction (level 5).
    Normal,
    /// Peer-learning broadcast (level 7).
    Medium,
    /// Exceptional hit (level 8).
    High,
    /// Catastrophic miss (level 9). Never dropped under backpressure.
    VeryHigh,
}

impl QueuePriority {
    /// Numeric priority level.
    pub const fn level(self) -> u8 {
        match self {
            Self::Normal => 5,
            Self::Medium => 7,
            Self::High => 8,
            Self::VeryHigh => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_parse_known_names() {
        assert_eq!(Archetype::parse_lenient("Gambler"), Archetype::Gambler);
        assert_eq!(Archetype::parse_lenient("CONSERVATIVE"), Archetype::Conservative);
        assert_eq!(Archetype::parse_lenient("rookie"), Archetype::Rookie);
    }

    #[test]
    fn archetype_unknown_falls_back_to_default() {
        assert_eq!(Archetype::parse_lenient("momentum_rider"), Archetype::Default);
        assert_eq!(Archetype::parse_lenient(""), Archetype::Default);
    }

    #[test]
    fn risk_band_boundaries() {
        assert_eq!(EliminationRisk::from_ratio(1.0), EliminationRisk::Safe);
        assert_eq!(EliminationRisk::from_ratio(0.71), EliminationRisk::Safe);
        assert_eq!(EliminationRisk::from_ratio(0.7), EliminationRisk::Warning);
        assert_eq!(EliminationRisk::from_ratio(0.4), EliminationRisk::Danger);
        assert_eq!(EliminationRisk::from_ratio(0.15), EliminationRisk::Critical);
        assert_eq!(EliminationRisk::from_ratio(0.0), EliminationRisk::Critical);
    }

    #[test]
    fn revision_severity_ordering() {
        assert!(RevisionType::CompleteReversal.severity() > RevisionType::PredictionChange.severity());
        assert!(RevisionType::PredictionChange.severity() > RevisionType::ConfidenceShift.severity());
        assert!(RevisionType::NuancedAdjustment.severity() > 0.0);
    }

    #[test]
    fn pick_side_flip_is_involution() {
        assert_eq!(PickSide::Home.flipped(), PickSide::Away);
        assert_eq!(PickSide::Home.flipped().flipped(), PickSide::Home);
    }

    #[test]
    fn queue_priority_levels() {
        assert_eq!(QueuePriority::Normal.level(), 5);
        assert_eq!(QueuePriority::Medium.level(), 7);
        assert_eq!(QueuePriority::High.level(), 8);
        assert_eq!(QueuePriority::VeryHigh.level(), 9);
        assert!(QueuePriority::VeryHigh > QueuePriority::Normal);
    }

    #[test]
    fn section_trigger_mapping() {
        assert_eq!(UdvSection::Injuries.trigger(), RevisionTrigger::InjuryReport);
        assert_eq!(UdvSection::Market.trigger(), RevisionTrigger::LineMovement);
        assert_eq!(UdvSection::Stats.trigger(), RevisionTrigger::NewInformation);
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&MemoryType::UpsetDetection).unwrap_or_default();
        assert_eq!(json, "\"upset_detection\"");
        let json = serde_json::to_string(&RevisionTrigger::SelfReflection).unwrap_or_default();
        assert_eq!(json, "\"self_reflection\"");
    }
}
