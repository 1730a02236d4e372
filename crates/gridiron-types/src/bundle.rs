//! The structured prediction bundle and its fixed schema.
//!
//! Every expert emits one [`PredictionBundle`] per `(game, snapshot)`. The
//! bundle is a fixed 83-slot schema: five core calls, six period splits,
//! twenty team-stat lines, thirty-two player props, and twenty situational
//! events. The LLM's loose JSON is parsed into these types at the boundary
//! and validated *before* anything else touches it; inside the system a
//! bundle is always schema-valid. Validation failure is a hard reject that
//! counts against the expert's eligibility gate.
//!
//! # Feasibility rules
//!
//! - every confidence ∈ [0, 1] (`validator` range checks)
//! - factor weights ∈ [0, 1] and sum to 1 per assertion
//! - win probabilities for the two sides sum to 1
//! - totals and period points are non-negative
//! - spread magnitude is bounded (|spread| ≤ 45)
//!
//! Boundary coercion: confidence exactly 0 or 1 (degenerate certainty) is
//! coerced to 0.05 / 0.95 by [`coerce_confidence`] before validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::enums::{BetCategory, BundleStatus, PickSide};
use crate::ids::{ExpertId, GameId, PredictionId, SnapshotId};

// ---------------------------------------------------------------------------
// Schema manifest
// ---------------------------------------------------------------------------

/// Score-period labels, in game order.
pub const PERIOD_LABELS: [&str; 6] = ["q1", "q2", "q3", "q4", "h1", "h2"];

/// Team statistic keys required once per side.
pub const TEAM_STAT_KEYS: [&str; 10] = [
    "points",
    "rush_yards",
    "pass_yards",
    "total_yards",
    "turnovers",
    "sacks",
    "third_down_rate",
    "red_zone_rate",
    "penalty_yards",
    "possession_secs",
];

/// Player-prop keys required once per side.
pub const PROP_KEYS: [&str; 16] = [
    "qb_pass_yards",
    "qb_pass_tds",
    "qb_interceptions",
    "qb_rush_yards",
    "rb1_rush_yards",
    "rb1_rush_tds",
    "rb1_receptions",
    "wr1_rec_yards",
    "wr1_receptions",
    "wr1_rec_tds",
    "te1_rec_yards",
    "kicker_points",
    "defense_sacks",
    "defense_takeaways",
    "longest_play",
    "first_td_scorer_position",
];

/// Situational event keys, one call each.
pub const SITUATIONAL_KEYS: [&str; 20] = [
    "overtime",
    "first_score_td",
    "opening_drive_score",
    "lead_change_fourth_quarter",
    "game_winning_drive",
    "defensive_td",
    "special_teams_td",
    "successful_two_point",
    "missed_field_goal",
    "blocked_kick",
    "safety",
    "pick_six",
    "fourth_down_conversion",
    "fake_punt_or_fg",
    "onside_kick",
    "coach_challenge_won",
    "hundred_yard_rusher",
    "three_hundred_yard_passer",
    "hundred_yard_receiver",
    "either_team_shutout",
];

/// Total assertion slots in the fixed schema.
///
/// 5 core + 6 periods + 10 stats x 2 sides + 16 props x 2 sides + 20
/// situational events.
pub const SCHEMA_SLOT_COUNT: usize =
    5 + PERIOD_LABELS.len() + TEAM_STAT_KEYS.len() * 2 + PROP_KEYS.len() * 2 + SITUATIONAL_KEYS.len();

/// Maximum feasible spread magnitude.
const MAX_SPREAD_MAGNITUDE: f64 = 45.0;

/// Tolerance for probability and weight sums.
const SUM_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Boundary coercion
// ---------------------------------------------------------------------------

/// Coerce a raw confidence at the schema boundary.
///
/// Degenerate certainty is never accepted: values at or below 0 become
/// 0.05, values at or above 1 become 0.95. Everything in between passes
/// through unchanged. Non-finite input maps to 0.05 (treated as "no
/// usable confidence").
pub fn coerce_confidence(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        0.05
    } else if raw >= 1.0 {
        0.95
    } else {
        raw
    }
}

// ---------------------------------------------------------------------------
// Factors and assertions
// ---------------------------------------------------------------------------

/// One ranked factor behind an assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Factor {
    /// Factor name (e.g. `defensive_strength`, `momentum`).
    pub name: String,
    /// Weight of this factor within the assertion, in [0, 1].
    #[validate(range(min = 0.0, max = 1.0))]
    pub weight: f64,
    /// The expert's confidence in this factor alone, in [0, 1].
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

/// Metadata common to every assertion slot: confidence, reasoning, and the
/// ranked factor list whose weights must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_factor_weights"))]
pub struct Assertion {
    /// Confidence in this specific call, in [0, 1].
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    /// Free-text reasoning. Not used by any scoring path.
    pub reasoning: String,
    /// Ranked factors, highest weight first.
    #[validate(nested)]
    pub factors: Vec<Factor>,
}

/// Schema-level check: non-empty factor lists must have weights summing to 1.
fn validate_factor_weights(assertion: &Assertion) -> Result<(), ValidationError> {
    if assertion.factors.is_empty() {
        return Ok(());
    }
    let sum: f64 = assertion.factors.iter().map(|f| f.weight).sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        let mut err = ValidationError::new("factor_weights");
        err.message = Some(format!("factor weights sum to {sum}, expected 1.0").into());
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Core calls
// ---------------------------------------------------------------------------

/// The straight-winner call with side win probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_win_probabilities"))]
pub struct WinnerCall {
    /// Picked side.
    pub pick: PickSide,
    /// Probability the home team wins, in (0, 1).
    #[validate(range(min = 0.0, max = 1.0))]
    pub win_probability_home: f64,
    /// Probability the away team wins, in (0, 1).
    #[validate(range(min = 0.0, max = 1.0))]
    pub win_probability_away: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// Schema-level check: the two win probabilities must sum to 1.
fn validate_win_probabilities(call: &WinnerCall) -> Result<(), ValidationError> {
    let sum = call.win_probability_home + call.win_probability_away;
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        let mut err = ValidationError::new("win_probabilities");
        err.message = Some(format!("win probabilities sum to {sum}, expected 1.0").into());
        return Err(err);
    }
    Ok(())
}

/// The against-the-spread call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_spread_bounds"))]
pub struct SpreadCall {
    /// Predicted spread from the home team's perspective.
    pub spread_home: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// Schema-level check: spread magnitude is bounded.
fn validate_spread_bounds(call: &SpreadCall) -> Result<(), ValidationError> {
    if !call.spread_home.is_finite() || call.spread_home.abs() > MAX_SPREAD_MAGNITUDE {
        let mut err = ValidationError::new("spread_bounds");
        err.message = Some(format!("infeasible spread {}", call.spread_home).into());
        return Err(err);
    }
    Ok(())
}

/// The combined-score total call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_total_bounds"))]
pub struct TotalCall {
    /// Predicted combined score.
    pub total: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// Schema-level check: totals are non-negative and finite.
fn validate_total_bounds(call: &TotalCall) -> Result<(), ValidationError> {
    if !call.total.is_finite() || call.total < 0.0 {
        let mut err = ValidationError::new("total_bounds");
        err.message = Some(format!("infeasible total {}", call.total).into());
        return Err(err);
    }
    Ok(())
}

/// The margin-of-victory call (home minus away).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MarginCall {
    /// Predicted final margin, home minus away.
    pub margin_home: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// A quarter or half scoring split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_period_points"))]
pub struct PeriodCall {
    /// Period label (see [`PERIOD_LABELS`]).
    pub label: String,
    /// Predicted home points in the period.
    pub home_points: f64,
    /// Predicted away points in the period.
    pub away_points: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// Schema-level check: period points are non-negative.
fn validate_period_points(call: &PeriodCall) -> Result<(), ValidationError> {
    let feasible = call.home_points.is_finite()
        && call.away_points.is_finite()
        && call.home_points >= 0.0
        && call.away_points >= 0.0;
    if !feasible {
        let mut err = ValidationError::new("period_points");
        err.message =
            Some(format!("infeasible period points for {}", call.label).into());
        return Err(err);
    }
    Ok(())
}

/// A team statistical line call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TeamStatCall {
    /// Which side the stat belongs to.
    pub side: PickSide,
    /// Stat key (see [`TEAM_STAT_KEYS`]).
    pub stat_key: String,
    /// Predicted value.
    pub value: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// A player proposition call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlayerPropCall {
    /// Which side the prop belongs to.
    pub side: PickSide,
    /// Prop key (see [`PROP_KEYS`]).
    pub prop_key: String,
    /// The predicted line value.
    pub line_value: f64,
    /// Over (true) or under (false) the line.
    pub over: bool,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

/// A situational event call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SituationalCall {
    /// Event key (see [`SITUATIONAL_KEYS`]).
    pub event_key: String,
    /// Whether the expert predicts the event occurs.
    pub happens: bool,
    /// Probability the event occurs, in [0, 1].
    #[validate(range(min = 0.0, max = 1.0))]
    pub probability: f64,
    /// Confidence, reasoning, and factors.
    #[validate(nested)]
    pub assertion: Assertion,
}

// ---------------------------------------------------------------------------
// PredictionBundle
// ---------------------------------------------------------------------------

/// One expert's full structured prediction for one game snapshot.
///
/// Generated once per `(expert, game, snapshot)`. A later bundle for the
/// same `(expert, game)` is a *revision* handled by the belief revision
/// detector, never an overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionBundle {
    /// Row identifier.
    pub prediction_id: PredictionId,
    /// The predicting expert.
    pub expert_id: ExpertId,
    /// The game being predicted.
    pub game_id: GameId,
    /// The UDV snapshot the prediction was made from.
    pub snapshot_id: SnapshotId,
    /// Expert profile version pinned at predict time.
    pub profile_version: u32,
    /// Generation outcome. Failed bundles carry empty category lists.
    pub status: BundleStatus,
    /// Winner call.
    #[validate(nested)]
    pub winner: WinnerCall,
    /// Spread call.
    #[validate(nested)]
    pub spread: SpreadCall,
    /// Total call.
    #[validate(nested)]
    pub total: TotalCall,
    /// Margin call.
    #[validate(nested)]
    pub margin: MarginCall,
    /// Quarter and half splits (six, per [`PERIOD_LABELS`]).
    #[validate(nested)]
    pub periods: Vec<PeriodCall>,
    /// Team stat lines (one per key per side).
    #[validate(nested)]
    pub team_stats: Vec<TeamStatCall>,
    /// Player props (one per key per side).
    #[validate(nested)]
    pub player_props: Vec<PlayerPropCall>,
    /// Situational events (one per key).
    #[validate(nested)]
    pub situational: Vec<SituationalCall>,
    /// Aggregate confidence across the bundle, in [0, 1].
    #[validate(range(min = 0.0, max = 1.0))]
    pub overall_confidence: f64,
    /// When the bundle was generated.
    pub created_at: DateTime<Utc>,
}

impl PredictionBundle {
    /// Number of assertion slots actually filled.
    pub fn slot_count(&self) -> usize {
        5_usize
            .saturating_add(self.periods.len())
            .saturating_add(self.team_stats.len())
            .saturating_add(self.player_props.len())
            .saturating_add(self.situational.len())
    }

    /// Full schema validation: derive-level checks plus the slot manifest.
    ///
    /// The manifest requires every period label, every team stat key per
    /// side, every prop key per side, and every situational key to appear
    /// exactly once -- the fixed 83-slot schema.
    ///
    /// # Errors
    ///
    /// Returns the accumulated [`ValidationErrors`] on any violation.
    pub fn validate_schema(&self) -> Result<(), ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();

        check_manifest(
            &mut errors,
            "periods",
            &PERIOD_LABELS,
            &self.periods.iter().map(|p| p.label.clone()).collect::<Vec<_>>(),
        );
        check_sided_manifest(
            &mut errors,
            "team_stats",
            &TEAM_STAT_KEYS,
            &self
                .team_stats
                .iter()
                .map(|s| (s.side, s.stat_key.clone()))
                .collect::<Vec<_>>(),
        );
        check_sided_manifest(
            &mut errors,
            "player_props",
            &PROP_KEYS,
            &self
                .player_props
                .iter()
                .map(|p| (p.side, p.prop_key.clone()))
                .collect::<Vec<_>>(),
        );
        check_manifest(
            &mut errors,
            "situational",
            &SITUATIONAL_KEYS,
            &self
                .situational
                .iter()
                .map(|s| s.event_key.clone())
                .collect::<Vec<_>>(),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Confidence of the assertion backing a given bet category, if the
    /// bundle carries one.
    pub fn category_confidence(&self, category: BetCategory) -> Option<f64> {
        match category {
            BetCategory::Winner => Some(self.winner.assertion.confidence),
            BetCategory::Spread => Some(self.spread.assertion.confidence),
            BetCategory::Total => Some(self.total.assertion.confidence),
            BetCategory::Margin => Some(self.margin.assertion.confidence),
            BetCategory::PeriodSplit => self
                .periods
                .iter()
                .map(|p| p.assertion.confidence)
                .reduce(f64::max),
            BetCategory::TeamStat => self
                .team_stats
                .iter()
                .map(|s| s.assertion.confidence)
                .reduce(f64::max),
            BetCategory::PlayerProp => self
                .player_props
                .iter()
                .map(|p| p.assertion.confidence)
                .reduce(f64::max),
            BetCategory::Situational => self
                .situational
                .iter()
                .map(|s| s.assertion.confidence)
                .reduce(f64::max),
        }
    }

    /// Ranked factor names across the whole bundle, for revision diffing.
    ///
    /// Concatenates the core-call factor lists in slot order. Duplicates
    /// are retained; the edit-distance comparison treats the list as a
    /// sequence.
    pub fn factor_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for f in &self.winner.assertion.factors {
            names.push(f.name.clone());
        }
        for f in &self.spread.assertion.factors {
            names.push(f.name.clone());
        }
        for f in &self.total.assertion.factors {
            names.push(f.name.clone());
        }
        for f in &self.margin.assertion.factors {
            names.push(f.name.clone());
        }
        names
    }
}

/// Verify an unsided slot group matches its manifest exactly once each.
fn check_manifest(
    errors: &mut ValidationErrors,
    field: &'static str,
    manifest: &[&str],
    actual: &[String],
) {
    for key in manifest {
        let count = actual.iter().filter(|a| a.as_str() == *key).count();
        if count != 1 {
            let mut err = ValidationError::new("schema_manifest");
            err.message = Some(
                format!("{field}: key {key} appears {count} times, expected exactly 1").into(),
            );
            errors.add(field, err);
        }
    }
    if actual.len() != manifest.len() {
        let mut err = ValidationError::new("schema_manifest");
        err.message = Some(
            format!(
                "{field}: {} slots, schema requires {}",
                actual.len(),
                manifest.len()
            )
            .into(),
        );
        errors.add(field, err);
    }
}

/// Verify a sided slot group matches its manifest once per side.
fn check_sided_manifest(
    errors: &mut ValidationErrors,
    field: &'static str,
    manifest: &[&str],
    actual: &[(PickSide, String)],
) {
    for side in [PickSide::Home, PickSide::Away] {
        for key in manifest {
            let count = actual
                .iter()
                .filter(|(s, k)| *s == side && k.as_str() == *key)
                .count();
            if count != 1 {
                let mut err = ValidationError::new("schema_manifest");
                err.message = Some(
                    format!(
                        "{field}: key {key} for {side:?} appears {count} times, expected exactly 1"
                    )
                    .into(),
                );
                errors.add(field, err);
            }
        }
    }
    if actual.len() != manifest.len().saturating_mul(2) {
        let mut err = ValidationError::new("schema_manifest");
        err.message = Some(
            format!(
                "{field}: {} slots, schema requires {}",
                actual.len(),
                manifest.len().saturating_mul(2)
            )
            .into(),
        );
        errors.add(field, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn assertion(confidence: f64) -> Assertion {
        Assertion {
            confidence,
            reasoning: String::from("test reasoning"),
            factors: vec![
                Factor {
                    name: String::from("defensive_strength"),
                    weight: 0.6,
                    confidence: 0.7,
                },
                Factor {
                    name: String::from("momentum"),
                    weight: 0.4,
                    confidence: 0.5,
                },
            ],
        }
    }

    /// Build a bundle that satisfies the full 83-slot manifest.
    fn full_bundle() -> PredictionBundle {
        let periods = PERIOD_LABELS
            .iter()
            .map(|label| PeriodCall {
                label: String::from(*label),
                home_points: 7.0,
                away_points: 3.0,
                assertion: assertion(0.5),
            })
            .collect();

        let mut team_stats = Vec::new();
        let mut player_props = Vec::new();
        for side in [PickSide::Home, PickSide::Away] {
            for key in TEAM_STAT_KEYS {
                team_stats.push(TeamStatCall {
                    side,
                    stat_key: String::from(key),
                    value: 100.0,
                    assertion: assertion(0.5),
                });
            }
            for key in PROP_KEYS {
                player_props.push(PlayerPropCall {
                    side,
                    prop_key: String::from(key),
                    line_value: 50.0,
                    over: true,
                    assertion: assertion(0.5),
                });
            }
        }

        let situational = SITUATIONAL_KEYS
            .iter()
            .map(|key| SituationalCall {
                event_key: String::from(*key),
                happens: false,
                probability: 0.2,
                assertion: assertion(0.4),
            })
            .collect();

        PredictionBundle {
            prediction_id: PredictionId::new(),
            expert_id: ExpertId::new(),
            game_id: GameId::new(),
            snapshot_id: SnapshotId::new(),
            profile_version: 1,
            status: BundleStatus::Generated,
            winner: WinnerCall {
                pick: PickSide::Home,
                win_probability_home: 0.62,
                win_probability_away: 0.38,
                assertion: assertion(0.62),
            },
            spread: SpreadCall {
                spread_home: -3.0,
                assertion: assertion(0.55),
            },
            total: TotalCall {
                total: 48.5,
                assertion: assertion(0.5),
            },
            margin: MarginCall {
                margin_home: 4.0,
                assertion: assertion(0.45),
            },
            periods,
            team_stats,
            player_props,
            situational,
            overall_confidence: 0.58,
            created_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Coercion
    // -----------------------------------------------------------------------

    #[test]
    fn coerce_zero_to_floor() {
        assert!((coerce_confidence(0.0) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn coerce_one_to_ceiling() {
        assert!((coerce_confidence(1.0) - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn coerce_passes_interior_values() {
        assert!((coerce_confidence(0.72) - 0.72).abs() < f64::EPSILON);
    }

    #[test]
    fn coerce_handles_non_finite() {
        assert!((coerce_confidence(f64::NAN) - 0.05).abs() < f64::EPSILON);
        assert!((coerce_confidence(f64::INFINITY) - 0.95).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // Schema slot count
    // -----------------------------------------------------------------------

    #[test]
    fn schema_has_eighty_three_slots() {
        assert_eq!(SCHEMA_SLOT_COUNT, 83);
    }

    #[test]
    fn full_bundle_fills_every_slot() {
        let bundle = full_bundle();
        assert_eq!(bundle.slot_count(), SCHEMA_SLOT_COUNT);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn full_bundle_validates() {
        let bundle = full_bundle();
        assert!(bundle.validate_schema().is_ok());
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        let mut bundle = full_bundle();
        bundle.winner.assertion.confidence = 1.3;
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn factor_weights_must_sum_to_one() {
        let mut bundle = full_bundle();
        if let Some(factor) = bundle.spread.assertion.factors.first_mut() {
            factor.weight = 0.9;
        }
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn win_probabilities_must_sum_to_one() {
        let mut bundle = full_bundle();
        bundle.winner.win_probability_home = 0.7;
        bundle.winner.win_probability_away = 0.7;
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn negative_total_rejected() {
        let mut bundle = full_bundle();
        bundle.total.total = -3.0;
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn oversized_spread_rejected() {
        let mut bundle = full_bundle();
        bundle.spread.spread_home = -60.0;
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn missing_period_rejected() {
        let mut bundle = full_bundle();
        bundle.periods.pop();
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn duplicate_stat_key_rejected() {
        let mut bundle = full_bundle();
        if let Some(first) = bundle.team_stats.first().cloned() {
            bundle.team_stats.push(first);
        }
        assert!(bundle.validate_schema().is_err());
    }

    #[test]
    fn missing_situational_key_rejected() {
        let mut bundle = full_bundle();
        bundle.situational.retain(|s| s.event_key != "overtime");
        assert!(bundle.validate_schema().is_err());
    }

    // -----------------------------------------------------------------------
    // Category confidence and factor names
    // -----------------------------------------------------------------------

    #[test]
    fn category_confidence_for_core_calls() {
        let bundle = full_bundle();
        assert!(bundle
            .category_confidence(BetCategory::Winner)
            .is_some_and(|c| (c - 0.62).abs() < f64::EPSILON));
        assert!(bundle
            .category_confidence(BetCategory::Spread)
            .is_some_and(|c| (c - 0.55).abs() < f64::EPSILON));
    }

    #[test]
    fn factor_names_cover_core_calls() {
        let bundle = full_bundle();
        let names = bundle.factor_names();
        // Four core calls, two factors each.
        assert_eq!(names.len(), 8);
        assert!(names.iter().any(|n| n == "defensive_strength"));
    }
}
