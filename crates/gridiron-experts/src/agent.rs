//! The expert strategy object.
//!
//! Every expert is one [`ExpertAgent`] parameterized by a personality
//! profile -- there is no expert class hierarchy. The agent's capability
//! set is `{predict, reflect}`:
//!
//! - [`ExpertAgent::predict`] builds a full 83-slot bundle from a
//!   filtered view and retrieved memories. This is the deterministic
//!   heuristic core: the LLM runner produces richer free text on the hot
//!   path, but the numeric skeleton here is what property tests drive,
//!   and it is the fallback when the LLM output is rejected. Given the
//!   same `(view, memories, profile version, seed)` the numeric fields
//!   reproduce exactly; free text may vary upstream.
//! - [`ExpertAgent::reflect`] turns a settled outcome into lessons. When
//!   post-game reflection is disabled a *minimal* record is still
//!   emitted so the learning coordinator's input shape never changes.
//!
//! Personality shapes the numbers: recency bias blends rolling versus
//! season stats, analytics trust weights EPA, contrarianism loosens the
//! market anchor, and optimism nudges confidence.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use gridiron_types::bundle::{
    Assertion, Factor, MarginCall, PERIOD_LABELS, PROP_KEYS, PeriodCall, PlayerPropCall,
    PredictionBundle, SITUATIONAL_KEYS, SituationalCall, SpreadCall, TEAM_STAT_KEYS,
    TeamStatCall, TotalCall, WinnerCall, coerce_confidence,
};
use gridiron_types::{
    BundleStatus, EmotionalState, ExpertId, ExpertStatus, GameId, GameOutcome, InjuryStatus,
    PersonalityProfile, PickSide, PredictionId, TeamStatLine,
};

use crate::error::ExpertError;
use crate::filter::FilteredView;
use crate::memory::{ScoredMemory, apply_memory_influence};

/// Home-field advantage in points.
const HOME_FIELD_POINTS: f64 = 2.0;

/// Default combined score when no stats are visible.
const DEFAULT_TOTAL: f64 = 44.0;

/// Scoring share of each quarter (Q1..Q4).
const QUARTER_SHARES: [f64; 4] = [0.20, 0.28, 0.22, 0.30];

// ---------------------------------------------------------------------------
// Reflection
// ---------------------------------------------------------------------------

/// The expert's post-game reflection.
///
/// Always produced after settlement -- when reflection is disabled the
/// record is minimal (`minimal = true`, no lessons) but structurally
/// identical, so the learning coordinator consumes one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// The reflecting expert.
    pub expert_id: ExpertId,
    /// The game reflected on.
    pub game_id: GameId,
    /// How the result landed emotionally.
    pub emotional_state: EmotionalState,
    /// Lessons drawn (empty when minimal).
    pub lessons: Vec<String>,
    /// Absolute error of the stated home win probability.
    pub confidence_error: f64,
    /// Whether this is the minimal (reflection-disabled) record.
    pub minimal: bool,
}

// ---------------------------------------------------------------------------
// ExpertAgent
// ---------------------------------------------------------------------------

/// One expert: a strategy object over a personality profile.
#[derive(Debug, Clone)]
pub struct ExpertAgent {
    /// The expert's personality profile (version pinned by the caller).
    pub profile: PersonalityProfile,
}

impl ExpertAgent {
    /// Wrap a profile.
    pub const fn new(profile: PersonalityProfile) -> Self {
        Self { profile }
    }

    /// Produce a schema-complete prediction bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ExpertError::Eliminated`] if the expert's profile is
    /// eliminated; eliminated experts neither predict nor bet.
    pub fn predict(
        &self,
        view: &FilteredView,
        memories: &[ScoredMemory],
        seed: u64,
    ) -> Result<PredictionBundle, ExpertError> {
        if self.profile.status == ExpertStatus::Eliminated {
            return Err(ExpertError::Eliminated {
                expert_id: self.profile.expert_id,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);

        let (mut margin, mut total) = self.baseline(view);

        // Deterministic jitter: same seed, same numbers.
        margin += rng.random_range(-0.75..0.75);
        total += rng.random_range(-1.5..1.5);
        total = total.max(0.0);

        let win_probability_home = logistic(margin / 7.0);
        let pick = if margin >= 0.0 {
            PickSide::Home
        } else {
            PickSide::Away
        };

        let base_confidence =
            coerce_confidence(0.5 + (win_probability_home - 0.5).abs() * 0.8 + self.optimism_nudge());
        let confidence = apply_memory_influence(base_confidence, memories);

        let factors = self.build_factors(view);
        let core_assertion = |reasoning: &str| Assertion {
            confidence,
            reasoning: String::from(reasoning),
            factors: factors.clone(),
        };

        let home_points = (total + margin) / 2.0;
        let away_points = (total - margin) / 2.0;

        let bundle = PredictionBundle {
            prediction_id: PredictionId::new(),
            expert_id: self.profile.expert_id,
            game_id: view.game_id,
            snapshot_id: view.snapshot_id,
            profile_version: self.profile.version,
            status: BundleStatus::Generated,
            winner: WinnerCall {
                pick,
                win_probability_home,
                win_probability_away: 1.0 - win_probability_home,
                assertion: core_assertion("strength differential and situational edges"),
            },
            spread: SpreadCall {
                spread_home: (-margin).clamp(-45.0, 45.0),
                assertion: core_assertion("expected margin against the posted number"),
            },
            total: TotalCall {
                total,
                assertion: core_assertion("combined scoring expectation"),
            },
            margin: MarginCall {
                margin_home: margin,
                assertion: core_assertion("projected final margin"),
            },
            periods: build_periods(home_points, away_points, confidence),
            team_stats: self.build_team_stats(view, home_points, away_points, confidence),
            player_props: self.build_player_props(view, home_points, away_points, confidence),
            situational: build_situational(total, margin, confidence),
            overall_confidence: confidence,
            created_at: Utc::now(),
        };

        Ok(bundle)
    }

    /// Reflect on a settled outcome.
    ///
    /// `enabled = false` still returns a record -- minimal, no lessons --
    /// so downstream consumers never branch on absence.
    pub fn reflect(
        &self,
        bundle: &PredictionBundle,
        outcome: &GameOutcome,
        enabled: bool,
    ) -> Reflection {
        let actual_home = match outcome.winner() {
            Some(PickSide::Home) => 1.0,
            Some(PickSide::Away) => 0.0,
            None => 0.5,
        };
        let confidence_error = (bundle.winner.win_probability_home - actual_home).abs();
        let correct = outcome.winner() == Some(bundle.winner.pick);

        if !enabled {
            return Reflection {
                expert_id: self.profile.expert_id,
                game_id: bundle.game_id,
                emotional_state: EmotionalState::Neutral,
                lessons: Vec::new(),
                confidence_error,
                minimal: true,
            };
        }

        let emotional_state = match (correct, bundle.overall_confidence > 0.7) {
            (true, true) => EmotionalState::Euphoria,
            (true, false) => EmotionalState::Satisfaction,
            (false, true) => EmotionalState::Devastation,
            (false, false) => EmotionalState::Disappointment,
        };

        let mut lessons = Vec::new();
        let margin_error = (bundle.margin.margin_home - f64::from(outcome.margin_home())).abs();
        if margin_error > 10.0 {
            lessons.push(format!(
                "margin read missed by {margin_error:.0}; re-weight the dominant factor"
            ));
        }
        let total_error = (bundle.total.total - f64::from(outcome.total())).abs();
        if total_error > 10.0 {
            lessons.push(format!(
                "scoring environment missed by {total_error:.0}; check pace inputs"
            ));
        }
        if !correct && bundle.overall_confidence > 0.7 {
            lessons.push(String::from(
                "high-confidence miss; discount the factors that drove it",
            ));
        }
        if lessons.is_empty() {
            lessons.push(String::from("read held up; keep the current weighting"));
        }

        Reflection {
            expert_id: self.profile.expert_id,
            game_id: bundle.game_id,
            emotional_state,
            lessons,
            confidence_error,
            minimal: false,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Expected (margin, total) from the visible sections.
    fn baseline(&self, view: &FilteredView) -> (f64, f64) {
        let recency = self.profile.traits.recency_bias;
        let analytics = self.profile.traits.analytics_trust;

        let (mut margin, mut total) = view.stats.as_ref().map_or((0.0, DEFAULT_TOTAL), |stats| {
            let home = blend_stats(&stats.home_rolling, &stats.home_season, recency);
            let away = blend_stats(&stats.away_rolling, &stats.away_season, recency);
            let home_strength = home.points_for - home.points_against;
            let away_strength = away.points_for - away.points_against;
            let margin = (home_strength - away_strength) / 2.0;
            let total = (home.points_for + away.points_for).max(20.0);
            (margin, total)
        });
        margin += HOME_FIELD_POINTS;

        // Advanced metrics pull the margin toward the EPA differential.
        if let Some(historical) = view.historical.as_ref() {
            let epa_margin = (historical.home_epa_per_play - historical.away_epa_per_play) * 25.0;
            let w = analytics * 0.5;
            margin = margin * (1.0 - w) + epa_margin * w;
        }

        // The market anchor: non-contrarians lean on the posted number.
        if let Some(market) = view.market.as_ref() {
            let market_margin = -market.spread_home;
            let anchor = 0.4 * (1.0 - self.profile.traits.contrarianism);
            margin = margin * (1.0 - anchor) + market_margin * anchor;
            let total_anchor = 0.5 * (1.0 - self.profile.traits.contrarianism);
            total = total * (1.0 - total_anchor) + market.total * total_anchor;
        }

        // Weather suppresses scoring.
        if let Some(weather) = view.weather.as_ref() {
            if weather.wind_mph > 15.0 {
                total -= (weather.wind_mph - 15.0) * 0.3;
            }
            if weather.precipitation_chance > 0.5 {
                total -= 2.0;
            }
        }

        // Injuries shift the margin.
        if let Some(injuries) = view.injuries.as_ref() {
            let home_outs = count_outs(injuries, &view.home_team);
            let away_outs = count_outs(injuries, &view.away_team);
            margin -= f64::from(home_outs.min(4)) * 1.5;
            margin += f64::from(away_outs.min(4)) * 1.5;
        }

        (margin, total.max(0.0))
    }

    /// Confidence nudge from trait optimism.
    fn optimism_nudge(&self) -> f64 {
        (self.profile.traits.optimism - 0.5) * 0.05
    }

    /// The weighted factor list behind the core calls.
    ///
    /// Only factors backed by a visible section appear; learned factor
    /// multipliers scale the raw weights before normalization so the
    /// weights always sum to one.
    fn build_factors(&self, view: &FilteredView) -> Vec<Factor> {
        let mut raw: Vec<(&str, f64)> = Vec::new();
        if view.stats.is_some() {
            raw.push(("offensive_edge", 0.30));
            raw.push(("defensive_strength", 0.25));
        }
        if view.historical.is_some() {
            raw.push(("epa_trend", 0.20 * self.profile.traits.analytics_trust.max(0.1)));
        }
        if view.market.is_some() {
            raw.push(("market_signal", 0.15));
        }
        if view.weather.is_some() {
            raw.push(("weather_conditions", 0.10));
        }
        if view.injuries.is_some() {
            raw.push(("injury_report", 0.15));
        }
        if view.news.is_some() {
            raw.push(("public_sentiment", 0.10 * self.profile.traits.contrarianism.max(0.1)));
        }
        if raw.is_empty() {
            raw.push(("baseline_model", 1.0));
        }

        let mut weighted: Vec<(String, f64)> = raw
            .into_iter()
            .map(|(name, weight)| {
                let scaled = weight * self.profile.factor_multiplier(name);
                (String::from(name), scaled)
            })
            .collect();
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
        weighted.truncate(5);

        let sum: f64 = weighted.iter().map(|(_, w)| w).sum();
        weighted
            .into_iter()
            .map(|(name, weight)| {
                let confidence = (0.45 + self.profile.factor_weight(&name) * 0.3).clamp(0.0, 1.0);
                Factor {
                    name,
                    weight: if sum > 0.0 { weight / sum } else { 0.0 },
                    confidence,
                }
            })
            .collect()
    }

    /// Team stat slots for both sides.
    fn build_team_stats(
        &self,
        view: &FilteredView,
        home_points: f64,
        away_points: f64,
        confidence: f64,
    ) -> Vec<TeamStatCall> {
        let mut calls = Vec::new();
        for side in [PickSide::Home, PickSide::Away] {
            let points = match side {
                PickSide::Home => home_points,
                PickSide::Away => away_points,
            };
            let line = self.stat_line_for(view, side);
            for key in TEAM_STAT_KEYS {
                let value = match key {
                    "points" => points,
                    "rush_yards" => line.rush_yards,
                    "pass_yards" => line.pass_yards,
                    "total_yards" => line.rush_yards + line.pass_yards,
                    "turnovers" => line.turnovers,
                    "sacks" => 2.5,
                    "third_down_rate" => line.third_down_rate,
                    "red_zone_rate" => line.red_zone_rate,
                    "penalty_yards" => 55.0,
                    _ => line.possession_secs,
                };
                calls.push(TeamStatCall {
                    side,
                    stat_key: String::from(key),
                    value,
                    assertion: bulk_assertion(confidence * 0.8),
                });
            }
        }
        calls
    }

    /// Player prop slots for both sides, derived from team volume.
    fn build_player_props(
        &self,
        view: &FilteredView,
        home_points: f64,
        away_points: f64,
        confidence: f64,
    ) -> Vec<PlayerPropCall> {
        let mut calls = Vec::new();
        for side in [PickSide::Home, PickSide::Away] {
            let points = match side {
                PickSide::Home => home_points,
                PickSide::Away => away_points,
            };
            let line = self.stat_line_for(view, side);
            for key in PROP_KEYS {
                let value = match key {
                    "qb_pass_yards" => line.pass_yards * 0.95,
                    "qb_pass_tds" => (points / 10.0).max(0.5),
                    "qb_interceptions" => line.turnovers * 0.6,
                    "qb_rush_yards" => 18.0,
                    "rb1_rush_yards" => line.rush_yards * 0.6,
                    "rb1_rush_tds" => (points / 14.0).max(0.3),
                    "rb1_receptions" => 3.0,
                    "wr1_rec_yards" => line.pass_yards * 0.3,
                    "wr1_receptions" => 6.0,
                    "wr1_rec_tds" => 0.6,
                    "te1_rec_yards" => line.pass_yards * 0.15,
                    "kicker_points" => (points * 0.3).max(3.0),
                    "defense_sacks" => 2.5,
                    "defense_takeaways" => 1.2,
                    "longest_play" => 38.0,
                    _ => 2.0,
                };
                calls.push(PlayerPropCall {
                    side,
                    prop_key: String::from(key),
                    line_value: value,
                    over: value > 0.0,
                    assertion: bulk_assertion(confidence * 0.7),
                });
            }
        }
        calls
    }

    /// The blended stat line for one side, or defaults when stats are
    /// hidden or absent.
    fn stat_line_for(&self, view: &FilteredView, side: PickSide) -> TeamStatLine {
        let recency = self.profile.traits.recency_bias;
        view.stats.as_ref().map_or_else(default_stat_line, |stats| match side {
            PickSide::Home => blend_stats(&stats.home_rolling, &stats.home_season, recency),
            PickSide::Away => blend_stats(&stats.away_rolling, &stats.away_season, recency),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Standard logistic function.
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Blend rolling and season stat lines by recency bias.
fn blend_stats(rolling: &TeamStatLine, season: &TeamStatLine, recency: f64) -> TeamStatLine {
    let blend = |r: f64, s: f64| r * recency + s * (1.0 - recency);
    TeamStatLine {
        points_for: blend(rolling.points_for, season.points_for),
        points_against: blend(rolling.points_against, season.points_against),
        rush_yards: blend(rolling.rush_yards, season.rush_yards),
        pass_yards: blend(rolling.pass_yards, season.pass_yards),
        turnovers: blend(rolling.turnovers, season.turnovers),
        third_down_rate: blend(rolling.third_down_rate, season.third_down_rate),
        red_zone_rate: blend(rolling.red_zone_rate, season.red_zone_rate),
        possession_secs: blend(rolling.possession_secs, season.possession_secs),
    }
}

/// League-average stat line used when stats are invisible.
fn default_stat_line() -> TeamStatLine {
    TeamStatLine {
        points_for: 22.0,
        points_against: 22.0,
        rush_yards: 115.0,
        pass_yards: 225.0,
        turnovers: 1.3,
        third_down_rate: 0.39,
        red_zone_rate: 0.55,
        possession_secs: 1_800.0,
    }
}

/// Count out/doubtful designations for a team.
fn count_outs(injuries: &[gridiron_types::InjuryReport], team: &str) -> u32 {
    let count = injuries
        .iter()
        .filter(|report| {
            report.team == team
                && matches!(report.status, InjuryStatus::Out | InjuryStatus::Doubtful)
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Single-factor assertion for bulk schema slots.
fn bulk_assertion(confidence: f64) -> Assertion {
    Assertion {
        confidence: confidence.clamp(0.0, 1.0),
        reasoning: String::from("derived from the core projection"),
        factors: vec![Factor {
            name: String::from("baseline_model"),
            weight: 1.0,
            confidence: confidence.clamp(0.0, 1.0),
        }],
    }
}

/// The six period splits from projected team points.
fn build_periods(home_points: f64, away_points: f64, confidence: f64) -> Vec<PeriodCall> {
    let quarter = |label: &str, share: f64| PeriodCall {
        label: String::from(label),
        home_points: (home_points * share).max(0.0),
        away_points: (away_points * share).max(0.0),
        assertion: bulk_assertion(confidence * 0.6),
    };

    let h1_share = QUARTER_SHARES.first().copied().unwrap_or(0.25)
        + QUARTER_SHARES.get(1).copied().unwrap_or(0.25);
    let h2_share = 1.0 - h1_share;

    PERIOD_LABELS
        .iter()
        .map(|label| match *label {
            "q1" => quarter("q1", QUARTER_SHARES.first().copied().unwrap_or(0.25)),
            "q2" => quarter("q2", QUARTER_SHARES.get(1).copied().unwrap_or(0.25)),
            "q3" => quarter("q3", QUARTER_SHARES.get(2).copied().unwrap_or(0.25)),
            "q4" => quarter("q4", QUARTER_SHARES.get(3).copied().unwrap_or(0.25)),
            "h1" => quarter("h1", h1_share),
            _ => quarter("h2", h2_share),
        })
        .collect()
}

/// The twenty situational event calls.
fn build_situational(total: f64, margin: f64, confidence: f64) -> Vec<SituationalCall> {
    let close_game = margin.abs() < 4.0;
    let high_scoring = total > 48.0;

    SITUATIONAL_KEYS
        .iter()
        .map(|key| {
            let probability: f64 = match *key {
                "overtime" => {
                    if close_game {
                        0.12
                    } else {
                        0.05
                    }
                }
                "first_score_td" => 0.55,
                "opening_drive_score" => 0.42,
                "lead_change_fourth_quarter" => {
                    if close_game {
                        0.45
                    } else {
                        0.15
                    }
                }
                "game_winning_drive" => {
                    if close_game {
                        0.40
                    } else {
                        0.12
                    }
                }
                "defensive_td" => 0.22,
                "special_teams_td" => 0.08,
                "successful_two_point" => 0.25,
                "missed_field_goal" => 0.45,
                "blocked_kick" => 0.07,
                "safety" => 0.04,
                "pick_six" => 0.10,
                "fourth_down_conversion" => 0.60,
                "fake_punt_or_fg" => 0.06,
                "onside_kick" => 0.18,
                "coach_challenge_won" => 0.35,
                "hundred_yard_rusher" => 0.40,
                "three_hundred_yard_passer" => {
                    if high_scoring {
                        0.45
                    } else {
                        0.25
                    }
                }
                "hundred_yard_receiver" => 0.50,
                _ => 0.03,
            };
            SituationalCall {
                event_key: String::from(*key),
                happens: probability >= 0.5,
                probability,
                assertion: bulk_assertion(confidence * 0.5),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gridiron_types::{
        AccessFlags, Archetype, GameId, MarketSection, PersonalityTraits, SectionSlot,
        SnapshotId, StatsSection, UniversalGameData,
    };

    use crate::filter::filter_view;

    use super::*;

    fn stat_line(points_for: f64, points_against: f64) -> TeamStatLine {
        TeamStatLine {
            points_for,
            points_against,
            rush_yards: 120.0,
            pass_yards: 240.0,
            turnovers: 1.1,
            third_down_rate: 0.42,
            red_zone_rate: 0.58,
            possession_secs: 1_850.0,
        }
    }

    fn udv() -> UniversalGameData {
        UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id: GameId::new(),
            snapshot_time: Utc::now(),
            home_team: String::from("KC"),
            away_team: String::from("BUF"),
            kickoff: Utc::now(),
            venue: String::from("Arrowhead Stadium"),
            market: SectionSlot::present(
                MarketSection {
                    spread_home: -3.0,
                    moneyline_home: -155,
                    moneyline_away: 135,
                    total: 48.5,
                    bookmaker: String::from("consensus"),
                    last_update: Utc::now(),
                },
                Utc::now(),
            ),
            weather: SectionSlot::absent(),
            injuries: SectionSlot::absent(),
            stats: SectionSlot::present(
                StatsSection {
                    home_rolling: stat_line(27.0, 19.0),
                    home_season: stat_line(25.0, 20.0),
                    away_rolling: stat_line(22.0, 23.0),
                    away_season: stat_line(24.0, 22.0),
                },
                Utc::now(),
            ),
            historical: SectionSlot::absent(),
            news: SectionSlot::absent(),
        }
    }

    fn profile() -> PersonalityProfile {
        PersonalityProfile {
            expert_id: ExpertId::new(),
            name: String::from("The Professor"),
            archetype: Archetype::Scholar,
            traits: PersonalityTraits {
                risk_tolerance: 0.4,
                contrarianism: 0.3,
                optimism: 0.5,
                recency_bias: 0.4,
                analytics_trust: 0.9,
            },
            access: AccessFlags::all(),
            factor_weights: BTreeMap::new(),
            learning_rate: 0.05,
            version: 1,
            status: ExpertStatus::Active,
        }
    }

    #[test]
    fn predict_fills_the_full_schema() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 42).ok();
        assert!(bundle.is_some());
        if let Some(bundle) = bundle {
            assert!(bundle.validate_schema().is_ok());
            assert_eq!(bundle.slot_count(), gridiron_types::SCHEMA_SLOT_COUNT);
        }
    }

    #[test]
    fn predict_is_deterministic_for_a_seed() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let a = agent.predict(&view, &[], 7).ok();
        let b = agent.predict(&view, &[], 7).ok();
        assert!(a.is_some() && b.is_some());
        if let (Some(a), Some(b)) = (a, b) {
            assert!((a.spread.spread_home - b.spread.spread_home).abs() < f64::EPSILON);
            assert!((a.total.total - b.total.total).abs() < f64::EPSILON);
            assert!((a.overall_confidence - b.overall_confidence).abs() < f64::EPSILON);
            assert_eq!(a.winner.pick, b.winner.pick);
        }
    }

    #[test]
    fn different_seeds_move_the_numbers() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let a = agent.predict(&view, &[], 1).ok();
        let b = agent.predict(&view, &[], 2).ok();
        if let (Some(a), Some(b)) = (a, b) {
            let same_spread = (a.spread.spread_home - b.spread.spread_home).abs() < f64::EPSILON;
            let same_total = (a.total.total - b.total.total).abs() < f64::EPSILON;
            assert!(!(same_spread && same_total));
        }
    }

    #[test]
    fn eliminated_expert_cannot_predict() {
        let mut p = profile();
        p.status = ExpertStatus::Eliminated;
        let agent = ExpertAgent::new(p);
        let view = filter_view(&udv(), &agent.profile);
        assert!(matches!(
            agent.predict(&view, &[], 1),
            Err(ExpertError::Eliminated { .. })
        ));
    }

    #[test]
    fn confidence_stays_in_band() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        for seed in 0..20 {
            let bundle = agent.predict(&view, &[], seed).ok();
            assert!(bundle.is_some_and(|b| {
                (0.10..=0.95).contains(&b.overall_confidence)
            }));
        }
    }

    #[test]
    fn win_probabilities_sum_to_one() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 3).ok();
        assert!(bundle.is_some_and(|b| {
            (b.winner.win_probability_home + b.winner.win_probability_away - 1.0).abs() < 1e-9
        }));
    }

    #[test]
    fn blind_view_still_produces_a_valid_bundle() {
        let mut p = profile();
        p.access = AccessFlags {
            stats: false,
            odds: false,
            weather: false,
            injuries: false,
            historical: false,
            public_betting: false,
        };
        let agent = ExpertAgent::new(p);
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 9).ok();
        assert!(bundle.is_some_and(|b| b.validate_schema().is_ok()));
    }

    // -----------------------------------------------------------------------
    // Reflection
    // -----------------------------------------------------------------------

    fn settled_outcome(game_id: GameId) -> GameOutcome {
        GameOutcome {
            game_id,
            home_score: 27,
            away_score: 20,
        }
    }

    #[test]
    fn reflection_enabled_draws_lessons() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 11).ok();
        assert!(bundle.is_some());
        if let Some(bundle) = bundle {
            let reflection = agent.reflect(&bundle, &settled_outcome(bundle.game_id), true);
            assert!(!reflection.minimal);
            assert!(!reflection.lessons.is_empty());
        }
    }

    #[test]
    fn reflection_disabled_is_minimal_but_present() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 11).ok();
        assert!(bundle.is_some());
        if let Some(bundle) = bundle {
            let reflection = agent.reflect(&bundle, &settled_outcome(bundle.game_id), false);
            assert!(reflection.minimal);
            assert!(reflection.lessons.is_empty());
            assert_eq!(reflection.emotional_state, EmotionalState::Neutral);
        }
    }

    #[test]
    fn wrong_confident_call_is_devastation() {
        let agent = ExpertAgent::new(profile());
        let view = filter_view(&udv(), &agent.profile);
        let bundle = agent.predict(&view, &[], 11).ok();
        assert!(bundle.is_some());
        if let Some(mut bundle) = bundle {
            bundle.winner.pick = PickSide::Away;
            bundle.overall_confidence = 0.85;
            let reflection = agent.reflect(&bundle, &settled_outcome(bundle.game_id), true);
            assert_eq!(reflection.emotional_state, EmotionalState::Devastation);
        }
    }
}
