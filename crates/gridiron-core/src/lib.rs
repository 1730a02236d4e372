//! Orchestration for the Gridiron Council platform.
//!
//! This crate wires the expert population, the bankroll loop, and the
//! learning substrate into the weekly rhythm of the platform:
//!
//! - [`round`] -- the per-game prediction round (source trait, heuristic
//!   source, transactional game settlement)
//! - [`council`] -- weekly top-K selection over eligibility and the
//!   composite score
//! - [`consensus`] -- weighted combination of council bundles per game
//! - [`learning`] -- outcome scoring, weight updates, memory
//!   construction, peer learning
//! - [`queue`] -- the bounded priority queue the learning worker drains
//!
//! Everything here is synchronous and in-memory; the database layer
//! persists the results and the engine binary drives the sequence.

pub mod consensus;
pub mod council;
pub mod error;
pub mod learning;
pub mod queue;
pub mod round;

// Re-export primary types at crate root.
pub use consensus::{ConsensusOutput, MemberBundle, MemberWeights, aggregate};
pub use council::{
    CouncilCandidate, CouncilMetrics, CouncilSelection, CouncilSelector, DEFAULT_COUNCIL_SIZE,
    MIN_PREDICTIONS, rank_candidates,
};
pub use error::CoreError;
pub use learning::{
    LearningScore, WeightAdjustment, apply_weight_updates, build_memory, emotional_state_for,
    incorporate_peer_broadcast, is_peer_candidate, peer_broadcast_events, score_prediction,
    settlement_event, settlement_priority,
};
pub use queue::{EnqueueOutcome, LearningQueue};
pub use round::{
    GameSettlement, HeuristicSource, PredictOutcome, PredictRequest, PredictionSource,
    RoundResult, run_round, settle_game,
};
