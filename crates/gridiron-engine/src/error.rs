//! Engine errors and their operational exit codes.
//!
//! Exit code contract:
//! - 0 success
//! - 2 validation failure (bad input, schema reject)
//! - 3 adapter outage (external data unavailable after retries)
//! - 4 invariant violation (a bug; requires human audit)

use gridiron_bank::BankError;
use gridiron_core::CoreError;
use gridiron_db::DbError;
use gridiron_runner::RunnerError;
use gridiron_udv::UdvError;

/// Errors surfaced by the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Operator input did not validate.
    #[error("validation failure: {0}")]
    Validation(String),

    /// An external adapter was unreachable after retries.
    #[error(transparent)]
    Adapter(#[from] UdvError),

    /// A data-layer operation failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// An orchestration operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bankroll operation failed.
    #[error(transparent)]
    Bank(#[from] BankError),

    /// An LLM runner operation failed.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

impl EngineError {
    /// The process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Adapter(_) => 3,
            Self::Bank(BankError::InvariantBreach(_))
            | Self::Core(CoreError::InvariantBreach(_)) => 4,
            Self::Runner(RunnerError::SchemaReject(_) | RunnerError::Parse(_)) => 2,
            Self::Db(_) | Self::Core(_) | Self::Bank(_) | Self::Runner(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_two() {
        let e = EngineError::Validation(String::from("bad week"));
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn adapter_outage_maps_to_three() {
        let e = EngineError::Adapter(UdvError::Transient(String::from("down")));
        assert_eq!(e.exit_code(), 3);
    }

    #[test]
    fn invariant_breach_maps_to_four() {
        let e = EngineError::Bank(BankError::InvariantBreach(String::from("negative payout")));
        assert_eq!(e.exit_code(), 4);
    }
}
