//! Shared type definitions for the Gridiron Council platform.
//!
//! This crate is the single source of truth for all types used across the
//! workspace. Nothing here performs I/O; domain logic lives in the owning
//! crates and the database layer persists these records verbatim.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (lifecycle, taxonomy, risk bands)
//! - [`udv`] -- The Universal Data View and its sections
//! - [`bundle`] -- The fixed 83-slot prediction bundle schema
//! - [`structs`] -- Core entity structs (profiles, memories, revisions,
//!   bankrolls, bets, learning events, run metadata)

pub mod bundle;
pub mod enums;
pub mod ids;
pub mod structs;
pub mod udv;

// Re-export all public types at crate root for convenience.
pub use bundle::{
    Assertion, Factor, MarginCall, PERIOD_LABELS, PROP_KEYS, PeriodCall, PlayerPropCall,
    PredictionBundle, SCHEMA_SLOT_COUNT, SITUATIONAL_KEYS, SituationalCall, SpreadCall,
    TEAM_STAT_KEYS, TeamStatCall, TotalCall, WinnerCall, coerce_confidence,
};
pub use enums::{
    Archetype, BetCategory, BetSelection, BetStatus, BundleStatus, EliminationRisk,
    EmotionalState, ExpertStatus, InjuryStatus, MemoryType, PickSide, QueuePriority,
    RevisionTrigger, RevisionType, UdvSection,
};
pub use ids::{
    BetId, ExpertId, GameId, LearningEventId, MemoryId, PredictionId, RevisionId, RunId,
    SnapshotId,
};
pub use structs::{
    AccessFlags, Bankroll, BeliefRevision, CategoryConfidence, CausalStep, EpisodicMemory,
    GameOutcome, LearningEvent, LearningEventKind, MAX_LEARNING_RATE, MIN_LEARNING_RATE,
    NEUTRAL_FACTOR_WEIGHT, PersonalityProfile, PersonalityTraits, ReasoningChain,
    ReasoningFactor, RunMetadata, VirtualBet,
};
pub use udv::{
    ALL_SECTIONS, HeadToHeadGame, HistoricalSection, InjuryReport, MarketSection, NewsSection,
    SectionSlot, StatsSection, TeamStatLine, UniversalGameData, WeatherSection,
};
