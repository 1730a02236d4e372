//! The Kelly bet sizer.
//!
//! The Kelly criterion gives the bankroll fraction that maximizes
//! long-run log growth: `f* = (p*b - (1-p)) / b`, where `p` is the
//! expert's stated probability and `b` is decimal odds minus one. Full
//! Kelly is violently volatile, so the fraction is scaled by a
//! personality multiplier -- a Gambler bets 1.5x Kelly, a Conservative
//! half of it.
//!
//! Sizing is a pure function of (confidence, odds, bankroll, multiplier):
//! the same inputs always produce the same stake. Every sizing attempt
//! yields either a [`SizedBet`] or a [`Refusal`] with an explicit reason,
//! which is what makes the confidence-to-bet coupling auditable.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use gridiron_types::Archetype;
use gridiron_types::bundle::coerce_confidence;

use crate::odds::{MONEY_DP, decimal_odds, implied_probability, profit_on_win};
use crate::BankError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Minimum edge (stated probability minus implied) required to bet.
pub const MIN_EDGE: f64 = 0.02;

/// Hard cap on the bankroll fraction a single stake may consume.
pub const MAX_BANKROLL_FRACTION: f64 = 0.30;

/// Sizer tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizerConfig {
    /// Smallest stake worth placing (default $5).
    pub min_stake: Decimal,
    /// Fraction of the current bankroll a single stake may not exceed
    /// (default 0.30).
    pub max_bankroll_fraction: f64,
    /// Absolute stake cap, typically derived from starting units and a
    /// configured max fraction. `None` means no absolute cap.
    pub stake_cap: Option<Decimal>,
    /// Minimum edge required to bet (default 0.02).
    pub min_edge: f64,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            min_stake: Decimal::new(5, 0),
            max_bankroll_fraction: MAX_BANKROLL_FRACTION,
            stake_cap: None,
            min_edge: MIN_EDGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Archetype multipliers
// ---------------------------------------------------------------------------

/// The personality multiplier applied to the Kelly fraction.
///
/// The table covers every archetype; [`Archetype::Default`] is the
/// fallback for anything unrecognized at parse time.
pub const fn kelly_multiplier(archetype: Archetype) -> f64 {
    match archetype {
        Archetype::Gambler => 1.5,
        Archetype::Rebel => 1.2,
        Archetype::Scholar => 1.0,
        Archetype::Specialist => 0.9,
        Archetype::Analyst => 0.8,
        Archetype::Default => 0.75,
        Archetype::Veteran => 0.7,
        Archetype::Rookie => 0.6,
        Archetype::Conservative => 0.5,
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why the sizer declined to bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// Edge below the configured minimum.
    EdgeBelowThreshold,
    /// The clamped stake fell under the minimum stake.
    StakeBelowMinimum,
    /// The Kelly fraction was non-positive.
    KellyNonPositive,
    /// The bankroll cannot cover any stake.
    BankrollTooLow,
}

/// A refusal to bet, with the reason spelled out for the coupling log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refusal {
    /// Why the bet was refused.
    pub reason: RefusalReason,
    /// Human-readable detail (edge values, stake values).
    pub detail: String,
}

/// A fully sized bet ready for placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedBet {
    /// Stake in bankroll units, rounded to cents.
    pub stake: Decimal,
    /// Raw Kelly fraction before the personality multiplier.
    pub kelly_fraction: f64,
    /// Fraction actually applied (Kelly times multiplier).
    pub applied_fraction: f64,
    /// Edge at sizing time.
    pub edge: f64,
    /// Bookmaker implied probability at sizing time.
    pub implied_probability: f64,
    /// The personality multiplier that was applied.
    pub multiplier: f64,
    /// Profit if the bet wins.
    pub potential_payout: Decimal,
}

/// Outcome of a sizing attempt: a bet or an explicit refusal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizingDecision {
    /// Place this bet.
    Bet(SizedBet),
    /// Do not bet; the reason must be logged.
    Refused(Refusal),
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// Size a stake for a confident prediction.
///
/// Deterministic in `(confidence, american, bankroll, archetype, config)`.
///
/// # Errors
///
/// Returns [`BankError::InvalidOdds`] on a zero odds quote. Refusals
/// (thin edge, tiny stake) are *not* errors -- they are
/// [`SizingDecision::Refused`] values the caller must log.
pub fn size_bet(
    confidence: f64,
    american: i32,
    bankroll: Decimal,
    archetype: Archetype,
    config: &SizerConfig,
) -> Result<SizingDecision, BankError> {
    let p = coerce_confidence(confidence);
    let q = implied_probability(american)?;
    let edge = p - q;

    if edge < config.min_edge {
        return Ok(SizingDecision::Refused(Refusal {
            reason: RefusalReason::EdgeBelowThreshold,
            detail: format!("edge {edge:.4} below minimum {:.4}", config.min_edge),
        }));
    }

    if bankroll < config.min_stake {
        return Ok(SizingDecision::Refused(Refusal {
            reason: RefusalReason::BankrollTooLow,
            detail: format!("bankroll {bankroll} below minimum stake {}", config.min_stake),
        }));
    }

    let b = decimal_odds(american)? - 1.0;
    let kelly = (p * b - (1.0 - p)) / b;
    if kelly <= 0.0 {
        return Ok(SizingDecision::Refused(Refusal {
            reason: RefusalReason::KellyNonPositive,
            detail: format!("kelly fraction {kelly:.4} at odds {american}"),
        }));
    }

    let multiplier = kelly_multiplier(archetype);
    let applied = kelly * multiplier;

    let applied_dec = Decimal::from_f64(applied).ok_or_else(|| {
        BankError::InvariantBreach(format!("unrepresentable kelly fraction {applied}"))
    })?;
    let raw_stake = bankroll.checked_mul(applied_dec).ok_or_else(|| {
        BankError::InvariantBreach(format!("stake overflow at fraction {applied}"))
    })?;

    let fraction_cap = Decimal::from_f64(config.max_bankroll_fraction)
        .and_then(|f| bankroll.checked_mul(f))
        .unwrap_or(bankroll);
    let mut max_stake = fraction_cap;
    if let Some(cap) = config.stake_cap {
        max_stake = max_stake.min(cap);
    }

    let stake = raw_stake.min(max_stake).round_dp(MONEY_DP);

    if stake < config.min_stake {
        return Ok(SizingDecision::Refused(Refusal {
            reason: RefusalReason::StakeBelowMinimum,
            detail: format!("stake {stake} below minimum {}", config.min_stake),
        }));
    }

    let potential_payout = profit_on_win(american, stake)?;

    Ok(SizingDecision::Bet(SizedBet {
        stake,
        kelly_fraction: kelly,
        applied_fraction: applied,
        edge,
        implied_probability: q,
        multiplier,
        potential_payout,
    }))
}
