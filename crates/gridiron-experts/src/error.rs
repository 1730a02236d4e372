//! Error types for the expert subsystem.

use gridiron_types::ExpertId;

/// Errors that can occur inside an expert's prediction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ExpertError {
    /// The expert has been eliminated and may not predict or bet.
    #[error("expert {expert_id} is eliminated")]
    Eliminated {
        /// The eliminated expert.
        expert_id: ExpertId,
    },

    /// The filtered view left nothing for the expert to reason from.
    #[error("filtered view for expert {expert_id} has no visible sections")]
    EmptyView {
        /// The expert whose view was empty.
        expert_id: ExpertId,
    },

    /// A reasoning log was written to after being closed.
    #[error("reasoning log is closed")]
    LogClosed,

    /// An internal arithmetic or bounds contract was broken.
    #[error("invariant breach: {0}")]
    InvariantBreach(String),
}
