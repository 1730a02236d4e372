//! Atomic bet placement and the confidence-to-bet coupling.
//!
//! Placement is all-or-nothing: either the stake moves from the bankroll
//! into escrow and a bet row exists, or nothing changes. A sizing refusal
//! produces a [`RefusalLog`] instead -- never silence. Any prediction with
//! confidence at or above [`HIGH_CONFIDENCE_THRESHOLD`] that reaches the
//! placer therefore always leaves an audit trail, which is the coupling
//! contract: confident calls carry skin in the game or an explicit reason
//! why not.
//!
//! An eliminated expert cannot place bets; the attempt is a
//! [`BankError::BankrollUnderflow`], not a refusal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gridiron_types::{
    Bankroll, BetCategory, BetId, BetSelection, BetStatus, ExpertId, GameId, PersonalityProfile,
    RunId, VirtualBet,
};

use crate::kelly::{Refusal, SizerConfig, SizingDecision, size_bet};
use crate::BankError;

/// Confidence at or above which a prediction must bet or log a refusal.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Whether a prediction is confident enough to trigger the coupling rule.
pub fn requires_bet(confidence: f64) -> bool {
    confidence >= HIGH_CONFIDENCE_THRESHOLD
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// Everything the placer needs to attempt one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRequest {
    /// The run.
    pub run_id: RunId,
    /// The game being bet.
    pub game_id: GameId,
    /// Market category.
    pub category: BetCategory,
    /// What the bet backs.
    pub selection: BetSelection,
    /// The line, for spread and total markets.
    pub line: Option<f64>,
    /// Stated confidence from the prediction bundle.
    pub confidence: f64,
    /// American odds quote at placement time.
    pub american_odds: i32,
    /// Why the expert likes this bet.
    pub reasoning: String,
}

/// The logged record of a refusal to bet on a confident call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefusalLog {
    /// The run.
    pub run_id: RunId,
    /// The refusing expert.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// Market category.
    pub category: BetCategory,
    /// Confidence of the call that was not bet.
    pub confidence: f64,
    /// The sizer's refusal.
    pub refusal: Refusal,
    /// When the refusal was logged.
    pub created_at: DateTime<Utc>,
}

/// Outcome of a placement attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlacementOutcome {
    /// The bet was placed; the returned bankroll has the stake escrowed.
    Placed {
        /// The pending bet row.
        bet: VirtualBet,
        /// The bankroll after the stake moved to escrow.
        bankroll: Bankroll,
    },
    /// The sizer refused; the bankroll is untouched.
    Refused(RefusalLog),
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Attempt to place a bet for an expert.
///
/// On success the returned bankroll has `current_units` reduced by the
/// stake and `pending_stakes` increased by it; the caller persists both
/// the bet row and the bankroll in one transaction. On refusal the
/// bankroll is returned to the caller untouched inside the log record's
/// scope -- nothing to persist except the refusal itself.
///
/// # Errors
///
/// Returns [`BankError::BankrollUnderflow`] if the expert is eliminated
/// or the stake cannot be covered. Returns [`BankError::InvalidOdds`] on
/// a zero quote.
pub fn place_bet(
    request: &BetRequest,
    bankroll: &Bankroll,
    profile: &PersonalityProfile,
    config: &SizerConfig,
    now: DateTime<Utc>,
) -> Result<PlacementOutcome, BankError> {
    if !bankroll.active {
        return Err(BankError::BankrollUnderflow {
            stake: Decimal::ZERO,
            available: bankroll.current_units,
        });
    }

    let decision = size_bet(
        request.confidence,
        request.american_odds,
        bankroll.current_units,
        profile.archetype,
        config,
    )?;

    let sized = match decision {
        SizingDecision::Refused(refusal) => {
            tracing::info!(
                expert_id = %profile.expert_id,
                game_id = %request.game_id,
                category = ?request.category,
                confidence = request.confidence,
                reason = ?refusal.reason,
                "bet refused"
            );
            return Ok(PlacementOutcome::Refused(RefusalLog {
                run_id: request.run_id,
                expert_id: profile.expert_id,
                game_id: request.game_id,
                category: request.category,
                confidence: request.confidence,
                refusal,
                created_at: now,
            }));
        }
        SizingDecision::Bet(sized) => sized,
    };

    let bankroll_before = bankroll.current_units;
    let remaining = bankroll_before.checked_sub(sized.stake).ok_or_else(|| {
        BankError::InvariantBreach(format!("stake arithmetic failed: {}", sized.stake))
    })?;
    if remaining < Decimal::ZERO {
        return Err(BankError::BankrollUnderflow {
            stake: sized.stake,
            available: bankroll_before,
        });
    }

    let mut updated = bankroll.clone();
    updated.current_units = remaining;
    updated.pending_stakes = updated
        .pending_stakes
        .checked_add(sized.stake)
        .unwrap_or(updated.pending_stakes);

    let bet = VirtualBet {
        bet_id: BetId::new(),
        run_id: request.run_id,
        expert_id: profile.expert_id,
        game_id: request.game_id,
        category: request.category,
        selection: request.selection,
        line: request.line,
        confidence: request.confidence,
        american_odds: request.american_odds,
        stake: sized.stake,
        implied_probability: sized.implied_probability,
        edge: sized.edge,
        kelly_fraction: sized.kelly_fraction,
        personality_multiplier: sized.multiplier,
        potential_payout: sized.potential_payout,
        status: BetStatus::Pending,
        realized_payout: Decimal::ZERO,
        bankroll_before,
        bankroll_after: bankroll_before,
        reasoning: request.reasoning.clone(),
        placed_at: now,
        settled_at: None,
    };

    tracing::info!(
        expert_id = %profile.expert_id,
        game_id = %request.game_id,
        category = ?request.category,
        stake = %bet.stake,
        edge = bet.edge,
        "bet placed"
    );

    Ok(PlacementOutcome::Placed { bet, bankroll: updated })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gridiron_types::{
        AccessFlags, Archetype, ExpertStatus, PersonalityTraits, PickSide,
    };

    use super::*;

    fn profile(archetype: Archetype) -> PersonalityProfile {
        PersonalityProfile {
            expert_id: ExpertId::new(),
            name: String::from("test expert"),
            archetype,
            traits: PersonalityTraits {
                risk_tolerance: 0.5,
                contrarianism: 0.5,
                optimism: 0.5,
                recency_bias: 0.5,
                analytics_trust: 0.5,
            },
            access: AccessFlags::all(),
            factor_weights: BTreeMap::new(),
            learning_rate: 0.05,
            version: 1,
            status: ExpertStatus::Active,
        }
    }

    fn request(confidence: f64, odds: i32) -> BetRequest {
        BetRequest {
            run_id: RunId::new(),
            game_id: GameId::new(),
            category: BetCategory::Winner,
            selection: BetSelection::Side(PickSide::Home),
            line: None,
            confidence,
            american_odds: odds,
            reasoning: String::from("home defense travels"),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario B: confident favorite produces a pending bet row
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_b_produces_pending_bet_row() {
        let bankroll = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(500, 0));
        let profile = profile(Archetype::Scholar);

        let outcome = place_bet(
            &request(0.85, -200),
            &bankroll,
            &profile,
            &SizerConfig::default(),
            Utc::now(),
        );

        let placed = match outcome {
            Ok(PlacementOutcome::Placed { bet, bankroll }) => Some((bet, bankroll)),
            _ => None,
        };
        assert!(placed.is_some());
        if let Some((bet, bankroll)) = placed {
            assert_eq!(bet.stake, Decimal::new(150, 0));
            assert_eq!(bet.status, BetStatus::Pending);
            assert_eq!(bankroll.current_units, Decimal::new(350, 0));
            assert_eq!(bankroll.pending_stakes, Decimal::new(150, 0));
            assert_eq!(bet.bankroll_before, Decimal::new(500, 0));
        }
    }

    #[test]
    fn refusal_leaves_bankroll_untouched() {
        let bankroll = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(500, 0));
        let profile = profile(Archetype::Scholar);

        // Edge of 0.01 at even odds: below threshold.
        let outcome = place_bet(
            &request(0.51, 100),
            &bankroll,
            &profile,
            &SizerConfig::default(),
            Utc::now(),
        );

        let refused = match outcome {
            Ok(PlacementOutcome::Refused(log)) => Some(log),
            _ => None,
        };
        assert!(refused.is_some());
        if let Some(log) = refused {
            assert!((log.confidence - 0.51).abs() < f64::EPSILON);
        }
        // Caller-visible bankroll object is unchanged by refusal.
        assert_eq!(bankroll.current_units, Decimal::new(500, 0));
        assert_eq!(bankroll.pending_stakes, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // Scenario E: an eliminated expert cannot place
    // -----------------------------------------------------------------------

    #[test]
    fn eliminated_expert_gets_bankroll_underflow() {
        let mut bankroll = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(100, 0));
        bankroll.current_units = Decimal::ZERO;
        bankroll.active = false;
        bankroll.eliminated_at = Some(Utc::now());

        let result = place_bet(
            &request(0.90, -150),
            &bankroll,
            &profile(Archetype::Gambler),
            &SizerConfig::default(),
            Utc::now(),
        );

        assert!(matches!(result, Err(BankError::BankrollUnderflow { .. })));
    }

    #[test]
    fn coupling_threshold_is_seventy_percent() {
        assert!(requires_bet(0.70));
        assert!(requires_bet(0.85));
        assert!(!requires_bet(0.69));
    }
}
