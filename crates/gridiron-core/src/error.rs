//! Error types for the orchestration layer.

use gridiron_types::RunId;

/// Errors that can occur while orchestrating rounds, selections, and
/// settlements.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Council selection was attempted twice for the same (run, week).
    #[error("council selection already ran for run {run_id} week {week}")]
    SelectionAlreadyRan {
        /// The run.
        run_id: RunId,
        /// The week.
        week: u16,
    },

    /// A bankroll-loop operation failed.
    #[error(transparent)]
    Bank(#[from] gridiron_bank::BankError),

    /// An expert-pipeline operation failed.
    #[error(transparent)]
    Expert(#[from] gridiron_experts::ExpertError),

    /// An internal contract was broken.
    #[error("invariant breach: {0}")]
    InvariantBreach(String),
}
