//! American-odds arithmetic.
//!
//! American odds express payout relative to a $100 reference:
//!
//! - Positive odds `+a`: a winning $100 stake profits $a.
//! - Negative odds `-a`: a winning $a stake profits $100.
//! - Zero is not a valid quote and is rejected at input.
//!
//! Probabilities and fractions are `f64`; money is [`Decimal`] rounded to
//! cents so the sizer and settler agree to the penny.

use rust_decimal::Decimal;

use crate::BankError;

/// Decimal places kept on stakes and payouts.
pub const MONEY_DP: u32 = 2;

/// Validate an American odds quote. Zero is rejected.
///
/// # Errors
///
/// Returns [`BankError::InvalidOdds`] for a zero quote.
pub const fn validate(american: i32) -> Result<(), BankError> {
    if american == 0 {
        return Err(BankError::InvalidOdds);
    }
    Ok(())
}

/// Convert American odds to European decimal odds.
///
/// `+120` -> 2.2, `-200` -> 1.5.
///
/// # Errors
///
/// Returns [`BankError::InvalidOdds`] for a zero quote.
pub fn decimal_odds(american: i32) -> Result<f64, BankError> {
    validate(american)?;
    let a = f64::from(american);
    if american > 0 {
        Ok(1.0 + a / 100.0)
    } else {
        Ok(1.0 + 100.0 / -a)
    }
}

/// Bookmaker implied probability of an American quote.
///
/// `+120` -> 100/220, `-200` -> 200/300.
///
/// # Errors
///
/// Returns [`BankError::InvalidOdds`] for a zero quote.
pub fn implied_probability(american: i32) -> Result<f64, BankError> {
    validate(american)?;
    let a = f64::from(american);
    if american > 0 {
        Ok(100.0 / (a + 100.0))
    } else {
        Ok(-a / (-a + 100.0))
    }
}

/// Profit on a winning stake at the given American odds, rounded to cents.
///
/// - `a > 0`: `stake * a / 100`
/// - `a < 0`: `stake * 100 / (-a)`
///
/// # Errors
///
/// Returns [`BankError::InvalidOdds`] for a zero quote.
/// Returns [`BankError::InvariantBreach`] if the arithmetic fails or the
/// computed profit is negative -- a win can never cost money.
pub fn profit_on_win(american: i32, stake: Decimal) -> Result<Decimal, BankError> {
    validate(american)?;
    let hundred = Decimal::ONE_HUNDRED;
    let quote = Decimal::from(american.unsigned_abs());

    let profit = if american > 0 {
        stake.checked_mul(quote).and_then(|p| p.checked_div(hundred))
    } else {
        stake.checked_mul(hundred).and_then(|p| p.checked_div(quote))
    };

    let profit = profit.ok_or_else(|| {
        BankError::InvariantBreach(format!("payout overflow: stake {stake} at {american}"))
    })?;

    if profit < Decimal::ZERO {
        return Err(BankError::InvariantBreach(format!(
            "negative profit {profit} computed on a win"
        )));
    }

    Ok(profit.round_dp(MONEY_DP))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_odds_rejected_everywhere() {
        assert!(validate(0).is_err());
        assert!(decimal_odds(0).is_err());
        assert!(implied_probability(0).is_err());
        assert!(profit_on_win(0, Decimal::new(100, 0)).is_err());
    }

    #[test]
    fn decimal_odds_positive_quote() {
        let d = decimal_odds(120).unwrap_or_default();
        assert!((d - 2.2).abs() < 1e-9);
    }

    #[test]
    fn decimal_odds_negative_quote() {
        let d = decimal_odds(-200).unwrap_or_default();
        assert!((d - 1.5).abs() < 1e-9);
    }

    #[test]
    fn implied_probability_positive_quote() {
        // +120: 100/220
        let q = implied_probability(120).unwrap_or_default();
        assert!((q - 100.0 / 220.0).abs() < 1e-9);
    }

    #[test]
    fn implied_probability_negative_quote() {
        // -200: 200/300
        let q = implied_probability(-200).unwrap_or_default();
        assert!((q - 200.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn even_odds_imply_half() {
        let q = implied_probability(100).unwrap_or_default();
        assert!((q - 0.5).abs() < 1e-9);
        let q = implied_probability(-100).unwrap_or_default();
        assert!((q - 0.5).abs() < 1e-9);
    }

    #[test]
    fn profit_positive_quote() {
        // $133.33 at +120 -> $160.00 (scenario A payout).
        let profit = profit_on_win(120, Decimal::new(13_333, 2)).unwrap_or_default();
        assert_eq!(profit, Decimal::new(16_000, 2));
    }

    #[test]
    fn profit_negative_quote() {
        // $150 at -200 -> $75.00.
        let profit = profit_on_win(-200, Decimal::new(150, 0)).unwrap_or_default();
        assert_eq!(profit, Decimal::new(7_500, 2));
    }
}
