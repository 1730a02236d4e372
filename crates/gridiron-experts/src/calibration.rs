//! Per-category calibration state.
//!
//! Binary-ish categories (winner picks, situational events) track a
//! Beta(alpha, beta) posterior starting from the uniform Beta(1, 1)
//! prior. Numeric categories (spread, total, margin, stat lines) track an
//! exponential moving average of absolute error seeded with domain
//! priors. Each category also carries the personality factor-weight
//! multiplier the filter applies when that category's factors are scored.

use serde::{Deserialize, Serialize};

use gridiron_types::BetCategory;

// ---------------------------------------------------------------------------
// Beta calibration (binary categories)
// ---------------------------------------------------------------------------

/// Beta posterior over hit probability, uniform prior Beta(1, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaCalibration {
    /// Successes plus prior.
    pub alpha: f64,
    /// Failures plus prior.
    pub beta: f64,
}

impl BetaCalibration {
    /// The uniform prior.
    pub const fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Record one observation.
    pub fn record(&mut self, hit: bool) {
        if hit {
            self.alpha += 1.0;
        } else {
            self.beta += 1.0;
        }
    }

    /// Posterior mean hit rate.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Number of observations absorbed (excluding the prior).
    pub fn observations(&self) -> f64 {
        self.alpha + self.beta - 2.0
    }
}

impl Default for BetaCalibration {
    fn default() -> Self {
        Self::uniform()
    }
}

// ---------------------------------------------------------------------------
// EMA calibration (numeric categories)
// ---------------------------------------------------------------------------

/// Exponential moving average of absolute prediction error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaCalibration {
    /// Current mean absolute error.
    pub mean_error: f64,
    /// Domain-prior error scale (sigma), used to normalize skill.
    pub sigma: f64,
    /// EMA smoothing rate in (0, 1].
    pub rate: f64,
    /// Observations absorbed.
    pub count: u32,
}

impl EmaCalibration {
    /// Seed from domain priors.
    pub const fn with_priors(mean_error: f64, sigma: f64, rate: f64) -> Self {
        Self {
            mean_error,
            sigma,
            rate,
            count: 0,
        }
    }

    /// Absorb one absolute error observation.
    pub fn record(&mut self, abs_error: f64) {
        self.mean_error = self.mean_error * (1.0 - self.rate) + abs_error.abs() * self.rate;
        self.count = self.count.saturating_add(1);
    }

    /// Normalized skill in [0, 1]: 1 at zero error, 0 at two sigma or
    /// worse.
    pub fn skill(&self) -> f64 {
        if self.sigma <= 0.0 {
            return 0.0;
        }
        (1.0 - self.mean_error / (2.0 * self.sigma)).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Per-category state
// ---------------------------------------------------------------------------

/// The calibration model appropriate to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CalibrationModel {
    /// Binary hit/miss tracking.
    Beta(BetaCalibration),
    /// Numeric error tracking.
    Ema(EmaCalibration),
}

/// One expert's calibration for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// The category.
    pub category: BetCategory,
    /// The model and its state.
    pub model: CalibrationModel,
    /// Personality factor-weight multiplier for this category.
    pub factor_multiplier: f64,
}

impl CalibrationState {
    /// Fresh calibration for a category with the documented priors.
    pub fn fresh(category: BetCategory) -> Self {
        let model = match category {
            BetCategory::Winner | BetCategory::Situational => {
                CalibrationModel::Beta(BetaCalibration::uniform())
            }
            BetCategory::Spread | BetCategory::Margin => {
                // Spreads miss by about a touchdown on average.
                CalibrationModel::Ema(EmaCalibration::with_priors(7.0, 7.0, 0.15))
            }
            BetCategory::Total => {
                CalibrationModel::Ema(EmaCalibration::with_priors(9.0, 10.0, 0.15))
            }
            BetCategory::PeriodSplit | BetCategory::TeamStat | BetCategory::PlayerProp => {
                CalibrationModel::Ema(EmaCalibration::with_priors(0.5, 0.5, 0.2))
            }
        };
        Self {
            category,
            model,
            factor_multiplier: 1.0,
        }
    }

    /// The full per-category set for one expert.
    pub fn fresh_set() -> Vec<Self> {
        [
            BetCategory::Winner,
            BetCategory::Spread,
            BetCategory::Total,
            BetCategory::Margin,
            BetCategory::PeriodSplit,
            BetCategory::TeamStat,
            BetCategory::PlayerProp,
            BetCategory::Situational,
        ]
        .into_iter()
        .map(Self::fresh)
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Brier score
// ---------------------------------------------------------------------------

/// Brier score over (stated confidence, hit) pairs. Lower is better;
/// 0.25 is coin-flipping at 50% confidence.
pub fn brier_score(samples: &[(f64, bool)]) -> f64 {
    if samples.is_empty() {
        return 0.25;
    }
    let total: f64 = samples
        .iter()
        .map(|(confidence, hit)| {
            let outcome = if *hit { 1.0 } else { 0.0 };
            (confidence - outcome).powi(2)
        })
        .sum();
    let n = u32::try_from(samples.len()).unwrap_or(u32::MAX);
    total / f64::from(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_prior_means_half() {
        let beta = BetaCalibration::uniform();
        assert!((beta.mean() - 0.5).abs() < f64::EPSILON);
        assert!(beta.observations().abs() < f64::EPSILON);
    }

    #[test]
    fn beta_mean_moves_with_hits() {
        let mut beta = BetaCalibration::uniform();
        beta.record(true);
        beta.record(true);
        beta.record(false);
        // alpha 3, beta 2: mean 0.6.
        assert!((beta.mean() - 0.6).abs() < 1e-9);
        assert!((beta.observations() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ema_converges_toward_observations() {
        let mut ema = EmaCalibration::with_priors(7.0, 7.0, 0.5);
        ema.record(1.0);
        ema.record(1.0);
        ema.record(1.0);
        assert!(ema.mean_error < 2.0);
        assert_eq!(ema.count, 3);
    }

    #[test]
    fn ema_skill_improves_with_low_error() {
        let sharp = EmaCalibration::with_priors(2.0, 7.0, 0.15);
        let blunt = EmaCalibration::with_priors(12.0, 7.0, 0.15);
        assert!(sharp.skill() > blunt.skill());
        assert!((0.0..=1.0).contains(&sharp.skill()));
    }

    #[test]
    fn fresh_set_covers_every_category() {
        let set = CalibrationState::fresh_set();
        assert_eq!(set.len(), 8);
        assert!(set.iter().all(|s| (s.factor_multiplier - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn binary_categories_get_beta_models() {
        let winner = CalibrationState::fresh(BetCategory::Winner);
        assert!(matches!(winner.model, CalibrationModel::Beta(_)));
        let spread = CalibrationState::fresh(BetCategory::Spread);
        assert!(matches!(spread.model, CalibrationModel::Ema(_)));
    }

    #[test]
    fn brier_empty_is_coin_flip() {
        assert!((brier_score(&[]) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn brier_rewards_confident_hits() {
        let sharp = brier_score(&[(0.9, true), (0.8, true)]);
        let blunt = brier_score(&[(0.9, false), (0.8, false)]);
        assert!(sharp < blunt);
        assert!((sharp - ((0.1_f64).powi(2) + (0.2_f64).powi(2)) / 2.0).abs() < 1e-9);
    }
}
