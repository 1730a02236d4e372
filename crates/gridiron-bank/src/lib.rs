//! Virtual-bankroll accountability loop.
//!
//! Every confident prediction must put skin in the game. This crate turns
//! stated confidence into Kelly-sized wagers, places them against an
//! expert's bankroll, and settles them against final results. When a
//! bankroll reaches zero the expert is eliminated for the rest of the run.
//!
//! # Architecture
//!
//! - [`odds`] -- American-odds arithmetic (decimal conversion, implied
//!   probability, payout math).
//! - [`kelly`] -- The bet sizer: edge check, Kelly fraction, archetype
//!   multiplier, stake clamps.
//! - [`placement`] -- Atomic placement: either the bankroll is debited and
//!   a bet row exists, or neither. Confidence-to-bet coupling is enforced
//!   structurally: every sizing attempt yields a bet or a logged refusal.
//! - [`settlement`] -- Idempotent settlement, bankroll statistics, and the
//!   elimination latch.
//!
//! # Invariants
//!
//! 1. For every settled bet: `bankroll_after = bankroll_before +
//!    realized_payout` and `bankroll_after >= 0`.
//! 2. `settle(settle(bet)) == settle(bet)`.
//! 3. Sizing is deterministic in (confidence, odds, bankroll, multiplier).
//! 4. Elimination latches: once `active` flips false it never flips back
//!    within the run.
//!
//! The crate never panics; every failure is a typed [`BankError`].

pub mod kelly;
pub mod odds;
pub mod placement;
pub mod settlement;

// Re-export primary types at crate root.
pub use kelly::{
    Refusal, RefusalReason, SizedBet, SizerConfig, SizingDecision, kelly_multiplier, size_bet,
};
pub use placement::{
    BetRequest, HIGH_CONFIDENCE_THRESHOLD, PlacementOutcome, RefusalLog, place_bet, requires_bet,
};
pub use settlement::{BankrollStats, apply_settlement, settle_bet};

use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur in the bankroll loop.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    /// American odds of zero are meaningless and rejected at input.
    #[error("american odds of 0 are not valid")]
    InvalidOdds,

    /// A stake would drive the bankroll negative, or the expert is
    /// already eliminated.
    #[error("bankroll underflow: stake {stake} against {available} available")]
    BankrollUnderflow {
        /// The stake that was attempted.
        stake: Decimal,
        /// Units available at attempt time.
        available: Decimal,
    },

    /// An internal contract was broken (e.g. a win computed a negative
    /// payout). Fatal: the caller must stop and surface for audit.
    #[error("invariant breach: {0}")]
    InvariantBreach(String),
}
