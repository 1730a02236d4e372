//! Expert strategy objects for the Gridiron Council platform.
//!
//! One strategy object, fifteen personalities. This crate owns everything
//! that happens between "a UDV exists" and "a schema-valid prediction
//! bundle with an audit trail exists":
//!
//! - [`personality`] -- the fixed fifteen-expert seed roster
//! - [`filter`] -- projecting the UDV through access flags (fairness)
//! - [`memory`] -- retrieval scoring and bounded memory influence
//! - [`agent`] -- the `{predict, reflect}` strategy object
//! - [`reasoning`] -- reasoning chains, monologues, the write-only log
//! - [`revision`] -- the belief revision detector
//! - [`calibration`] -- per-category Beta/EMA calibration state
//! - [`eligibility`] -- the schema-validity and latency SLO gate
//!
//! Everything here is synchronous and deterministic; the async LLM hot
//! path lives in the runner crate and feeds the same types.

pub mod agent;
pub mod calibration;
pub mod eligibility;
pub mod error;
pub mod filter;
pub mod memory;
pub mod personality;
pub mod reasoning;
pub mod revision;

// Re-export primary types at crate root.
pub use agent::{ExpertAgent, Reflection};
pub use calibration::{
    BetaCalibration, CalibrationModel, CalibrationState, EmaCalibration, brier_score,
};
pub use eligibility::{
    EligibilityGate, GateSample, LATENCY_TARGET_MS, SCHEMA_VALIDITY_TARGET, WINDOW,
};
pub use error::ExpertError;
pub use filter::{FilteredView, filter_view};
pub use memory::{
    RetrievalConfig, RetrievalQuery, ScoredMemory, apply_memory_influence, blended_score,
    memory_confidence_adjustment, rank_memories,
};
pub use personality::{ROSTER_SIZE, seed_roster};
pub use reasoning::{ReasoningLog, aggregate_confidence, build_chain};
pub use revision::{classify, detect_revision};
