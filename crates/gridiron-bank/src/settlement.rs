//! Bet settlement and bankroll accounting.
//!
//! Settlement resolves a pending bet against the final score, computes the
//! realized payout, releases the escrowed stake, and updates the bankroll
//! statistics. Settling an already-settled bet is a no-op that returns the
//! bet unchanged -- `settle(settle(bet)) == settle(bet)`.
//!
//! # Payout rules (American odds `a`, stake `s`)
//!
//! - `a > 0`: win pays `s * a / 100`, loss pays `-s`.
//! - `a < 0`: win pays `s * 100 / (-a)`, loss pays `-s`.
//! - Push refunds the stake, net zero.
//!
//! # Elimination latch
//!
//! When settlement leaves `current_units` at zero with no stakes left in
//! escrow, the expert is eliminated: `active` flips false, the date is
//! recorded, and no later event flips it back within the run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use gridiron_types::{
    Bankroll, BetCategory, BetSelection, BetStatus, GameOutcome, PickSide, VirtualBet,
};

use crate::odds::profit_on_win;
use crate::BankError;

/// Tolerance for line comparisons (half-point lines never push).
const LINE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// The graded result of a bet against a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grade {
    Win,
    Loss,
    Push,
}

/// Grade a bet against the outcome.
fn grade(bet: &VirtualBet, outcome: &GameOutcome) -> Result<Grade, BankError> {
    match (bet.category, bet.selection) {
        (BetCategory::Winner, BetSelection::Side(side)) => Ok(match outcome.winner() {
            Some(winner) if winner == side => Grade::Win,
            Some(_) => Grade::Loss,
            None => Grade::Push,
        }),
        (BetCategory::Spread, BetSelection::Side(side)) => {
            let line = bet.line.ok_or_else(|| {
                BankError::InvariantBreach(String::from("spread bet without a line"))
            })?;
            let margin_for_side = match side {
                PickSide::Home => f64::from(outcome.margin_home()),
                PickSide::Away => -f64::from(outcome.margin_home()),
            };
            let cover = margin_for_side + line;
            if cover.abs() < LINE_EPSILON {
                Ok(Grade::Push)
            } else if cover > 0.0 {
                Ok(Grade::Win)
            } else {
                Ok(Grade::Loss)
            }
        }
        (BetCategory::Total, selection @ (BetSelection::Over | BetSelection::Under)) => {
            let line = bet.line.ok_or_else(|| {
                BankError::InvariantBreach(String::from("total bet without a line"))
            })?;
            let total = f64::from(outcome.total());
            let diff = total - line;
            if diff.abs() < LINE_EPSILON {
                Ok(Grade::Push)
            } else if (diff > 0.0) == (selection == BetSelection::Over) {
                Ok(Grade::Win)
            } else {
                Ok(Grade::Loss)
            }
        }
        (category, selection) => Err(BankError::InvariantBreach(format!(
            "unsettleable bet: {category:?} backing {selection:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Settle a bet against the final score.
///
/// Idempotent: a bet that is not pending is returned unchanged. For a
/// pending bet the realized payout, post-settlement bankroll figures,
/// status, and settlement timestamp are filled in.
///
/// # Errors
///
/// Returns [`BankError::InvariantBreach`] if the bet cannot be graded
/// (missing line, unsettleable category) or a win computes a negative
/// payout.
pub fn settle_bet(
    bet: &VirtualBet,
    outcome: &GameOutcome,
    now: DateTime<Utc>,
) -> Result<VirtualBet, BankError> {
    if bet.status != BetStatus::Pending {
        return Ok(bet.clone());
    }

    let graded = grade(bet, outcome)?;

    let (status, realized) = match graded {
        Grade::Win => {
            let profit = profit_on_win(bet.american_odds, bet.stake)?;
            (BetStatus::Won, profit)
        }
        Grade::Loss => {
            let loss = Decimal::ZERO
                .checked_sub(bet.stake)
                .ok_or_else(|| BankError::InvariantBreach(String::from("stake negation failed")))?;
            (BetStatus::Lost, loss)
        }
        Grade::Push => (BetStatus::Push, Decimal::ZERO),
    };

    let bankroll_after = bet.bankroll_before.checked_add(realized).ok_or_else(|| {
        BankError::InvariantBreach(format!("bankroll arithmetic failed on {realized}"))
    })?;
    if bankroll_after < Decimal::ZERO {
        return Err(BankError::InvariantBreach(format!(
            "settlement would take bankroll negative: {bankroll_after}"
        )));
    }

    let mut settled = bet.clone();
    settled.status = status;
    settled.realized_payout = realized;
    settled.bankroll_after = bankroll_after;
    settled.settled_at = Some(now);

    tracing::debug!(
        bet_id = %settled.bet_id,
        expert_id = %settled.expert_id,
        status = ?settled.status,
        realized = %settled.realized_payout,
        "bet settled"
    );

    Ok(settled)
}

/// Apply a settled bet to its bankroll.
///
/// Releases the escrowed stake, credits the payout, updates cumulative
/// statistics, and runs the elimination latch. Already-applied bets must
/// not be passed twice; the settlement path guarantees this by settling
/// each game's bets exactly once inside one transaction.
///
/// # Errors
///
/// Returns [`BankError::InvariantBreach`] if the bet is still pending or
/// the escrow does not cover the stake.
pub fn apply_settlement(
    bankroll: &mut Bankroll,
    bet: &VirtualBet,
    now: DateTime<Utc>,
) -> Result<(), BankError> {
    if bet.status == BetStatus::Pending {
        return Err(BankError::InvariantBreach(String::from(
            "cannot apply a pending bet to a bankroll",
        )));
    }

    let escrow_release = bet.stake.checked_add(bet.realized_payout).ok_or_else(|| {
        BankError::InvariantBreach(String::from("escrow release arithmetic failed"))
    })?;
    // Win: stake + profit. Push: stake. Loss: stake + (-stake) = 0.
    if escrow_release < Decimal::ZERO {
        return Err(BankError::InvariantBreach(format!(
            "negative escrow release {escrow_release}"
        )));
    }

    bankroll.pending_stakes = bankroll
        .pending_stakes
        .checked_sub(bet.stake)
        .filter(|p| *p >= Decimal::ZERO)
        .ok_or_else(|| {
            BankError::InvariantBreach(format!(
                "escrow underflow releasing {} from {}",
                bet.stake, bankroll.pending_stakes
            ))
        })?;

    bankroll.current_units = bankroll
        .current_units
        .checked_add(escrow_release)
        .ok_or_else(|| BankError::InvariantBreach(String::from("bankroll credit overflow")))?;

    bankroll.peak_units = bankroll.peak_units.max(bankroll.current_units);
    bankroll.total_bets = bankroll.total_bets.saturating_add(1);
    if bet.status == BetStatus::Won {
        bankroll.winning_bets = bankroll.winning_bets.saturating_add(1);
    }
    bankroll.total_staked = bankroll
        .total_staked
        .checked_add(bet.stake)
        .unwrap_or(bankroll.total_staked);
    bankroll.total_profit = bankroll
        .total_profit
        .checked_add(bet.realized_payout)
        .unwrap_or(bankroll.total_profit);
    bankroll.roi = if bankroll.total_staked > Decimal::ZERO {
        bankroll
            .total_profit
            .checked_div(bankroll.total_staked)
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    // Elimination latch: zero units and nothing left in escrow.
    if bankroll.active
        && bankroll.current_units <= Decimal::ZERO
        && bankroll.pending_stakes <= Decimal::ZERO
    {
        bankroll.active = false;
        bankroll.eliminated_at = Some(now);
        tracing::warn!(
            expert_id = %bankroll.expert_id,
            run_id = %bankroll.run_id,
            "expert eliminated: bankroll exhausted"
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Bankroll statistics
// ---------------------------------------------------------------------------

/// Performance statistics derived from a bankroll's settled returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollStats {
    /// Length of the current winning streak (0 if the last bet lost).
    pub win_streak: u32,
    /// Length of the current losing streak (0 if the last bet won).
    pub lose_streak: u32,
    /// Standard deviation of per-bet returns.
    pub volatility: f64,
    /// Mean return over its standard deviation (0 when flat).
    pub sharpe: f64,
    /// Largest peak-to-trough drop of the cumulative return curve.
    pub max_drawdown: Decimal,
}

impl BankrollStats {
    /// Compute statistics from per-bet realized returns in settlement
    /// order. Pushes (zero returns) break streaks without starting one.
    pub fn from_returns(returns: &[Decimal]) -> Self {
        let floats: Vec<f64> = returns.iter().filter_map(|r| r.to_f64()).collect();
        let n = u32::try_from(floats.len()).unwrap_or(u32::MAX);
        let count = f64::from(n);

        let (volatility, sharpe) = if floats.len() < 2 {
            (0.0, 0.0)
        } else {
            let mean = floats.iter().sum::<f64>() / count;
            let variance =
                floats.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / count;
            let stdev = variance.sqrt();
            let sharpe = if stdev > 0.0 { mean / stdev } else { 0.0 };
            (stdev, sharpe)
        };

        // Streaks from the tail.
        let mut win_streak: u32 = 0;
        let mut lose_streak: u32 = 0;
        for r in returns.iter().rev() {
            if *r > Decimal::ZERO && lose_streak == 0 {
                win_streak = win_streak.saturating_add(1);
            } else if *r < Decimal::ZERO && win_streak == 0 {
                lose_streak = lose_streak.saturating_add(1);
            } else {
                break;
            }
        }

        // Max drawdown over the cumulative return curve.
        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;
        for r in returns {
            equity = equity.checked_add(*r).unwrap_or(equity);
            peak = peak.max(equity);
            let drawdown = peak.checked_sub(equity).unwrap_or(Decimal::ZERO);
            max_drawdown = max_drawdown.max(drawdown);
        }

        Self {
            win_streak,
            lose_streak,
            volatility,
            sharpe,
            max_drawdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use gridiron_types::{BetId, ExpertId, GameId, RunId};

    use super::*;

    fn pending_bet(
        category: BetCategory,
        selection: BetSelection,
        line: Option<f64>,
        american: i32,
        stake: Decimal,
        bankroll_before: Decimal,
    ) -> VirtualBet {
        VirtualBet {
            bet_id: BetId::new(),
            run_id: RunId::new(),
            expert_id: ExpertId::new(),
            game_id: GameId::new(),
            category,
            selection,
            line,
            confidence: 0.75,
            american_odds: american,
            stake,
            implied_probability: 0.5,
            edge: 0.1,
            kelly_fraction: 0.2,
            personality_multiplier: 1.0,
            potential_payout: Decimal::ZERO,
            status: BetStatus::Pending,
            realized_payout: Decimal::ZERO,
            bankroll_before,
            bankroll_after: bankroll_before,
            reasoning: String::from("test"),
            placed_at: Utc::now(),
            settled_at: None,
        }
    }

    fn outcome(home: u16, away: u16) -> GameOutcome {
        GameOutcome {
            game_id: GameId::new(),
            home_score: home,
            away_score: away,
        }
    }

    // -----------------------------------------------------------------------
    // Grading
    // -----------------------------------------------------------------------

    #[test]
    fn winner_bet_wins_with_side() {
        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Home),
            None,
            120,
            Decimal::new(100, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(settled.as_ref().is_some_and(|b| b.status == BetStatus::Won));
        // +120 on $100: profit $120.
        assert!(settled.is_some_and(|b| b.realized_payout == Decimal::new(120, 0)));
    }

    #[test]
    fn winner_bet_pushes_on_tie() {
        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Away),
            None,
            -110,
            Decimal::new(50, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(21, 21), Utc::now()).ok();
        assert!(settled.as_ref().is_some_and(|b| b.status == BetStatus::Push));
        assert!(settled.is_some_and(|b| b.realized_payout == Decimal::ZERO));
    }

    #[test]
    fn spread_bet_covers() {
        // Home -3.0, home wins by 7: covers.
        let bet = pending_bet(
            BetCategory::Spread,
            BetSelection::Side(PickSide::Home),
            Some(-3.0),
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(settled.is_some_and(|b| b.status == BetStatus::Won));
    }

    #[test]
    fn spread_bet_pushes_on_exact_line() {
        // Home -7, home wins by exactly 7.
        let bet = pending_bet(
            BetCategory::Spread,
            BetSelection::Side(PickSide::Home),
            Some(-7.0),
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(settled.is_some_and(|b| b.status == BetStatus::Push));
    }

    #[test]
    fn away_spread_bet_wins_when_home_fails_to_cover() {
        // Away +3.5, home wins by 3: away covers.
        let bet = pending_bet(
            BetCategory::Spread,
            BetSelection::Side(PickSide::Away),
            Some(3.5),
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(23, 20), Utc::now()).ok();
        assert!(settled.is_some_and(|b| b.status == BetStatus::Won));
    }

    #[test]
    fn total_over_wins_above_line() {
        let bet = pending_bet(
            BetCategory::Total,
            BetSelection::Over,
            Some(44.5),
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(settled.is_some_and(|b| b.status == BetStatus::Won));
    }

    #[test]
    fn total_under_loses_above_line() {
        let bet = pending_bet(
            BetCategory::Total,
            BetSelection::Under,
            Some(44.5),
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(settled.is_some_and(|b| b.status == BetStatus::Lost));
    }

    #[test]
    fn spread_bet_without_line_is_invariant_breach() {
        let bet = pending_bet(
            BetCategory::Spread,
            BetSelection::Side(PickSide::Home),
            None,
            -110,
            Decimal::new(110, 0),
            Decimal::new(500, 0),
        );
        assert!(settle_bet(&bet, &outcome(27, 20), Utc::now()).is_err());
    }

    // -----------------------------------------------------------------------
    // Idempotence (settle . settle == settle)
    // -----------------------------------------------------------------------

    #[test]
    fn settlement_is_idempotent() {
        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Home),
            None,
            120,
            Decimal::new(100, 0),
            Decimal::new(500, 0),
        );
        let once = settle_bet(&bet, &outcome(27, 20), Utc::now()).ok();
        assert!(once.is_some());
        if let Some(once) = once {
            let twice = settle_bet(&once, &outcome(27, 20), Utc::now()).ok();
            assert_eq!(twice, Some(once));
        }
    }

    // -----------------------------------------------------------------------
    // Invariant 1: bankroll_after = bankroll_before + realized_payout
    // -----------------------------------------------------------------------

    #[test]
    fn settled_bet_satisfies_bankroll_identity() {
        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Away),
            None,
            -200,
            Decimal::new(150, 0),
            Decimal::new(500, 0),
        );
        let settled = settle_bet(&bet, &outcome(10, 24), Utc::now()).ok();
        assert!(settled.is_some());
        if let Some(b) = settled {
            let expected = b.bankroll_before.checked_add(b.realized_payout);
            assert_eq!(Some(b.bankroll_after), expected);
            assert!(b.bankroll_after >= Decimal::ZERO);
        }
    }

    // -----------------------------------------------------------------------
    // Scenario E: elimination latch
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_e_elimination_latches_at_zero() {
        let expert = ExpertId::new();
        let run = RunId::new();
        let mut bankroll = Bankroll::fresh(expert, run, Decimal::new(10, 0));

        // A $10 stake is already escrowed (placed when rules permitted it).
        bankroll.current_units = Decimal::ZERO;
        bankroll.pending_stakes = Decimal::new(10, 0);

        let mut bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Home),
            None,
            -110,
            Decimal::new(10, 0),
            Decimal::new(10, 0),
        );
        bet.expert_id = expert;
        bet.run_id = run;

        let settled = settle_bet(&bet, &outcome(10, 24), Utc::now()).ok();
        assert!(settled.is_some());
        if let Some(settled) = settled {
            let applied = apply_settlement(&mut bankroll, &settled, Utc::now());
            assert!(applied.is_ok());
        }

        assert_eq!(bankroll.current_units, Decimal::ZERO);
        assert!(!bankroll.active);
        assert!(bankroll.eliminated_at.is_some());
    }

    #[test]
    fn win_updates_roi_and_peak() {
        let mut bankroll = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(100, 0));
        bankroll.current_units = Decimal::new(90, 0);
        bankroll.pending_stakes = Decimal::new(10, 0);

        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Home),
            None,
            100,
            Decimal::new(10, 0),
            Decimal::new(100, 0),
        );
        let settled = settle_bet(&bet, &outcome(30, 10), Utc::now()).ok();
        assert!(settled.is_some());
        if let Some(settled) = settled {
            let applied = apply_settlement(&mut bankroll, &settled, Utc::now());
            assert!(applied.is_ok());
        }

        // $90 + ($10 stake back + $10 profit) = $110.
        assert_eq!(bankroll.current_units, Decimal::new(110, 0));
        assert_eq!(bankroll.peak_units, Decimal::new(110, 0));
        assert_eq!(bankroll.total_bets, 1);
        assert_eq!(bankroll.winning_bets, 1);
        assert_eq!(bankroll.roi, Decimal::ONE);
        assert_eq!(bankroll.pending_stakes, Decimal::ZERO);
    }

    #[test]
    fn applying_pending_bet_is_rejected() {
        let mut bankroll = Bankroll::fresh(ExpertId::new(), RunId::new(), Decimal::new(100, 0));
        let bet = pending_bet(
            BetCategory::Winner,
            BetSelection::Side(PickSide::Home),
            None,
            100,
            Decimal::new(10, 0),
            Decimal::new(100, 0),
        );
        assert!(apply_settlement(&mut bankroll, &bet, Utc::now()).is_err());
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    #[test]
    fn stats_empty_returns_are_flat() {
        let stats = BankrollStats::from_returns(&[]);
        assert_eq!(stats.win_streak, 0);
        assert_eq!(stats.lose_streak, 0);
        assert!(stats.volatility.abs() < f64::EPSILON);
        assert_eq!(stats.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn stats_win_streak_counts_tail_wins() {
        let returns = [
            Decimal::new(-10, 0),
            Decimal::new(12, 0),
            Decimal::new(8, 0),
        ];
        let stats = BankrollStats::from_returns(&returns);
        assert_eq!(stats.win_streak, 2);
        assert_eq!(stats.lose_streak, 0);
    }

    #[test]
    fn stats_lose_streak_counts_tail_losses() {
        let returns = [
            Decimal::new(12, 0),
            Decimal::new(-10, 0),
            Decimal::new(-5, 0),
        ];
        let stats = BankrollStats::from_returns(&returns);
        assert_eq!(stats.lose_streak, 2);
        assert_eq!(stats.win_streak, 0);
    }

    #[test]
    fn stats_max_drawdown_tracks_peak_to_trough() {
        // Equity: +20, +30, -10, 0. Peak 30, trough -10: drawdown 40.
        let returns = [
            Decimal::new(20, 0),
            Decimal::new(10, 0),
            Decimal::new(-40, 0),
            Decimal::new(10, 0),
        ];
        let stats = BankrollStats::from_returns(&returns);
        assert_eq!(stats.max_drawdown, Decimal::new(40, 0));
    }

    #[test]
    fn stats_sharpe_positive_for_profitable_run() {
        let returns = [
            Decimal::new(10, 0),
            Decimal::new(12, 0),
            Decimal::new(-5, 0),
            Decimal::new(8, 0),
        ];
        let stats = BankrollStats::from_returns(&returns);
        assert!(stats.sharpe > 0.0);
        assert!(stats.volatility > 0.0);
    }
}
