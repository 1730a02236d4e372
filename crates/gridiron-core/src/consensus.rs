//! Consensus aggregation over council bundles.
//!
//! For each game the council members' bundles are combined into one
//! consensus output. Numeric fields take a weighted mean; the pick takes
//! a weighted vote. Per-member vote weight:
//!
//! ```text
//! w = 0.4*accuracy + 0.3*recent + 0.2*confidence + 0.1*specialization
//! ```
//!
//! The agreement metric is one minus the normalized entropy of the
//! weighted vote distribution: 1.0 when the council is unanimous, 0.0
//! when the weighted vote is a dead heat.

use serde::{Deserialize, Serialize};

use gridiron_types::{BundleStatus, ExpertId, GameId, PickSide, PredictionBundle};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Per-member weighting inputs, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberWeights {
    /// Window accuracy.
    pub accuracy: f64,
    /// Recent performance.
    pub recent: f64,
    /// Specialization in the category being aggregated.
    pub specialization_in_category: f64,
}

/// One council member's contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberBundle {
    /// The member.
    pub expert_id: ExpertId,
    /// The member's bundle.
    pub bundle: PredictionBundle,
    /// The member's weighting inputs.
    pub weights: MemberWeights,
}

/// Vote weight for one member on one category.
fn vote_weight(weights: &MemberWeights, confidence: f64) -> f64 {
    0.4 * weights.accuracy
        + 0.3 * weights.recent
        + 0.2 * confidence
        + 0.1 * weights.specialization_in_category
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The consensus bundle for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusOutput {
    /// The game.
    pub game_id: GameId,
    /// The weighted-vote winner pick.
    pub pick: PickSide,
    /// Winning option's aggregate confidence: the winners' weighted
    /// confidence over the total weight.
    pub pick_confidence: f64,
    /// One minus the normalized entropy of the weighted vote.
    pub agreement: f64,
    /// Weighted-mean spread (home perspective).
    pub spread_home: f64,
    /// Weighted-mean total.
    pub total: f64,
    /// Weighted-mean margin (home perspective).
    pub margin_home: f64,
    /// Weighted-mean home win probability.
    pub win_probability_home: f64,
    /// How many members contributed.
    pub contributing: usize,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Combine council bundles into a consensus output.
///
/// Failed generations are excluded; returns `None` when nothing usable
/// remains.
pub fn aggregate(game_id: GameId, members: &[MemberBundle]) -> Option<ConsensusOutput> {
    let usable: Vec<&MemberBundle> = members
        .iter()
        .filter(|m| m.bundle.status == BundleStatus::Generated)
        .collect();
    if usable.is_empty() {
        return None;
    }

    // Weighted vote on the pick.
    let mut home_weight = 0.0;
    let mut away_weight = 0.0;
    let mut home_conf_weight = 0.0;
    let mut away_conf_weight = 0.0;

    // Weighted means on the numeric fields.
    let mut total_weight = 0.0;
    let mut spread_sum = 0.0;
    let mut total_sum = 0.0;
    let mut margin_sum = 0.0;
    let mut win_prob_sum = 0.0;

    for member in &usable {
        let confidence = member.bundle.winner.assertion.confidence;
        let w = vote_weight(&member.weights, confidence).max(0.0);

        match member.bundle.winner.pick {
            PickSide::Home => {
                home_weight += w;
                home_conf_weight += w * confidence;
            }
            PickSide::Away => {
                away_weight += w;
                away_conf_weight += w * confidence;
            }
        }

        total_weight += w;
        spread_sum += w * member.bundle.spread.spread_home;
        total_sum += w * member.bundle.total.total;
        margin_sum += w * member.bundle.margin.margin_home;
        win_prob_sum += w * member.bundle.winner.win_probability_home;
    }

    if total_weight <= 0.0 {
        return None;
    }

    let (pick, winner_conf_weight) = if home_weight >= away_weight {
        (PickSide::Home, home_conf_weight)
    } else {
        (PickSide::Away, away_conf_weight)
    };

    let output = ConsensusOutput {
        game_id,
        pick,
        pick_confidence: winner_conf_weight / total_weight,
        agreement: agreement_from_vote(home_weight, away_weight),
        spread_home: spread_sum / total_weight,
        total: total_sum / total_weight,
        margin_home: margin_sum / total_weight,
        win_probability_home: win_prob_sum / total_weight,
        contributing: usable.len(),
    };

    tracing::debug!(
        game_id = %game_id,
        pick = ?output.pick,
        agreement = output.agreement,
        contributing = output.contributing,
        "consensus aggregated"
    );

    Some(output)
}

/// Agreement as one minus the normalized entropy of the two-way weighted
/// vote distribution.
fn agreement_from_vote(home_weight: f64, away_weight: f64) -> f64 {
    let total = home_weight + away_weight;
    if total <= 0.0 {
        return 0.0;
    }
    let p = home_weight / total;
    let q = away_weight / total;
    let entropy = [p, q]
        .into_iter()
        .filter(|x| *x > 0.0)
        .map(|x| -x * x.ln())
        .sum::<f64>();
    let normalized = entropy / 2.0_f64.ln();
    (1.0 - normalized).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use gridiron_types::bundle::{
        Assertion, MarginCall, SpreadCall, TotalCall, WinnerCall,
    };
    use gridiron_types::{PredictionId, SnapshotId};

    use super::*;

    fn bundle(pick: PickSide, spread: f64, confidence: f64) -> PredictionBundle {
        let assertion = |c: f64| Assertion {
            confidence: c,
            reasoning: String::from("test"),
            factors: Vec::new(),
        };
        PredictionBundle {
            prediction_id: PredictionId::new(),
            expert_id: ExpertId::new(),
            game_id: GameId::new(),
            snapshot_id: SnapshotId::new(),
            profile_version: 1,
            status: BundleStatus::Generated,
            winner: WinnerCall {
                pick,
                win_probability_home: if pick == PickSide::Home { 0.6 } else { 0.4 },
                win_probability_away: if pick == PickSide::Home { 0.4 } else { 0.6 },
                assertion: assertion(confidence),
            },
            spread: SpreadCall {
                spread_home: spread,
                assertion: assertion(confidence),
            },
            total: TotalCall {
                total: 47.0,
                assertion: assertion(confidence),
            },
            margin: MarginCall {
                margin_home: -spread,
                assertion: assertion(confidence),
            },
            periods: Vec::new(),
            team_stats: Vec::new(),
            player_props: Vec::new(),
            situational: Vec::new(),
            overall_confidence: confidence,
            created_at: Utc::now(),
        }
    }

    fn member(pick: PickSide, spread: f64, confidence: f64, accuracy: f64) -> MemberBundle {
        let b = bundle(pick, spread, confidence);
        MemberBundle {
            expert_id: b.expert_id,
            bundle: b,
            weights: MemberWeights {
                accuracy,
                recent: 0.6,
                specialization_in_category: 0.5,
            },
        }
    }

    #[test]
    fn empty_council_yields_no_consensus() {
        assert!(aggregate(GameId::new(), &[]).is_none());
    }

    #[test]
    fn unanimous_council_full_agreement() {
        let members = vec![
            member(PickSide::Home, -3.0, 0.7, 0.6),
            member(PickSide::Home, -4.0, 0.6, 0.6),
            member(PickSide::Home, -2.0, 0.8, 0.6),
        ];
        let out = aggregate(GameId::new(), &members);
        assert!(out.as_ref().is_some_and(|o| o.pick == PickSide::Home));
        assert!(out.is_some_and(|o| (o.agreement - 1.0).abs() < 1e-9));
    }

    #[test]
    fn dead_heat_is_zero_agreement() {
        // Identical weights on both sides of the vote.
        let members = vec![
            member(PickSide::Home, -3.0, 0.6, 0.6),
            member(PickSide::Away, 3.0, 0.6, 0.6),
        ];
        let out = aggregate(GameId::new(), &members);
        assert!(out.is_some_and(|o| o.agreement.abs() < 1e-9));
    }

    #[test]
    fn heavier_accuracy_swings_the_vote() {
        let members = vec![
            member(PickSide::Home, -3.0, 0.6, 0.95),
            member(PickSide::Away, 3.0, 0.6, 0.10),
        ];
        let out = aggregate(GameId::new(), &members);
        assert!(out.is_some_and(|o| o.pick == PickSide::Home));
    }

    #[test]
    fn numeric_fields_are_weight_averaged() {
        // Equal weights: the spread consensus is the plain mean.
        let members = vec![
            member(PickSide::Home, -2.0, 0.6, 0.6),
            member(PickSide::Home, -4.0, 0.6, 0.6),
        ];
        let out = aggregate(GameId::new(), &members);
        assert!(out.is_some_and(|o| (o.spread_home + 3.0).abs() < 1e-9));
    }

    #[test]
    fn failed_generations_excluded() {
        let mut failed = member(PickSide::Away, 3.0, 0.9, 0.9);
        failed.bundle.status = BundleStatus::GenerationFailed;
        let members = vec![failed, member(PickSide::Home, -3.0, 0.6, 0.6)];
        let out = aggregate(GameId::new(), &members);
        assert!(out.as_ref().is_some_and(|o| o.contributing == 1));
        assert!(out.is_some_and(|o| o.pick == PickSide::Home));
    }

    #[test]
    fn pick_confidence_is_winner_share_of_weight() {
        let members = vec![member(PickSide::Home, -3.0, 0.8, 0.6)];
        let out = aggregate(GameId::new(), &members);
        // Single member: confidence-weighted share equals its confidence.
        assert!(out.is_some_and(|o| (o.pick_confidence - 0.8).abs() < 1e-9));
    }
}
