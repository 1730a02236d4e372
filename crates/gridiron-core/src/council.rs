//! Weekly council selection.
//!
//! At each week boundary, eligible experts are ranked by a composite of
//! their evaluation-window metrics and the top K form the council:
//!
//! ```text
//! composite = 0.35*accuracy + 0.25*recent + 0.20*consistency
//!           + 0.10*calibration + 0.10*specialization
//! ```
//!
//! Eligibility is a prerequisite, not a component: an expert below the
//! schema-validity or latency SLO is excluded no matter how strong its
//! composite is. When eliminations and SLO failures thin the field the
//! council shrinks below K -- reserves are never silently substituted.
//!
//! Selection runs exactly once per `(run, week)`; the selector guards
//! against re-entry.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gridiron_types::{ExpertId, RunId};

use crate::error::CoreError;

/// Default council size.
pub const DEFAULT_COUNCIL_SIZE: usize = 5;

/// Minimum settled predictions inside the window to be rankable.
pub const MIN_PREDICTIONS: u32 = 10;

/// Evaluation window in weeks.
pub const EVALUATION_WINDOW_WEEKS: u32 = 4;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Evaluation-window metrics for one expert, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouncilMetrics {
    /// Correct pick rate on settled predictions.
    pub accuracy: f64,
    /// Exponentially-weighted recent accuracy.
    pub recent_performance: f64,
    /// One minus the standard deviation of weekly accuracy.
    pub consistency: f64,
    /// One minus the Brier score on stated confidences.
    pub calibration: f64,
    /// Best per-category accuracy.
    pub specialization: f64,
}

impl CouncilMetrics {
    /// The composite ranking score.
    pub fn composite(&self) -> f64 {
        0.35 * self.accuracy
            + 0.25 * self.recent_performance
            + 0.20 * self.consistency
            + 0.10 * self.calibration
            + 0.10 * self.specialization
    }
}

/// One expert's candidacy for the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilCandidate {
    /// The candidate expert.
    pub expert_id: ExpertId,
    /// Window metrics.
    pub metrics: CouncilMetrics,
    /// Whether the eligibility gate currently passes.
    pub eligible: bool,
    /// Whether the expert has been eliminated.
    pub eliminated: bool,
    /// Settled predictions inside the window.
    pub prediction_count: u32,
}

/// The result of one weekly selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilSelection {
    /// The run.
    pub run_id: RunId,
    /// Season week the council serves.
    pub week: u16,
    /// Selected experts, best composite first. May hold fewer than K.
    pub members: Vec<ExpertId>,
    /// When the selection ran.
    pub selected_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Rank candidates and pick the top K.
///
/// Tie-breaks, in order: higher recent performance, higher calibration,
/// lower variance (higher consistency), then the deterministic ID hash.
pub fn rank_candidates(candidates: &[CouncilCandidate], k: usize) -> Vec<ExpertId> {
    let mut qualified: Vec<&CouncilCandidate> = candidates
        .iter()
        .filter(|c| c.eligible && !c.eliminated && c.prediction_count >= MIN_PREDICTIONS)
        .collect();

    qualified.sort_by(|a, b| {
        b.metrics
            .composite()
            .total_cmp(&a.metrics.composite())
            .then_with(|| {
                b.metrics
                    .recent_performance
                    .total_cmp(&a.metrics.recent_performance)
            })
            .then_with(|| b.metrics.calibration.total_cmp(&a.metrics.calibration))
            .then_with(|| b.metrics.consistency.total_cmp(&a.metrics.consistency))
            .then_with(|| a.expert_id.into_inner().cmp(&b.expert_id.into_inner()))
    });

    qualified
        .into_iter()
        .take(k)
        .map(|c| c.expert_id)
        .collect()
}

/// The stateful selector guarding once-per-(run, week) execution.
#[derive(Debug, Default)]
pub struct CouncilSelector {
    completed: BTreeSet<(RunId, u16)>,
}

impl CouncilSelector {
    /// A selector with no completed selections.
    pub const fn new() -> Self {
        Self {
            completed: BTreeSet::new(),
        }
    }

    /// Restore the guard from already-persisted selections.
    pub fn with_completed(completed: impl IntoIterator<Item = (RunId, u16)>) -> Self {
        Self {
            completed: completed.into_iter().collect(),
        }
    }

    /// Run the weekly selection exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SelectionAlreadyRan`] if this `(run, week)`
    /// has already selected.
    pub fn select(
        &mut self,
        run_id: RunId,
        week: u16,
        candidates: &[CouncilCandidate],
        k: usize,
        now: DateTime<Utc>,
    ) -> Result<CouncilSelection, CoreError> {
        if !self.completed.insert((run_id, week)) {
            return Err(CoreError::SelectionAlreadyRan { run_id, week });
        }

        let members = rank_candidates(candidates, k);
        if members.len() < k {
            tracing::warn!(
                run_id = %run_id,
                week,
                selected = members.len(),
                requested = k,
                "council short of requested size; no reserves substituted"
            );
        }

        Ok(CouncilSelection {
            run_id,
            week,
            members,
            selected_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(metrics: CouncilMetrics, eligible: bool) -> CouncilCandidate {
        CouncilCandidate {
            expert_id: ExpertId::new(),
            metrics,
            eligible,
            eliminated: false,
            prediction_count: 20,
        }
    }

    fn metrics(accuracy: f64) -> CouncilMetrics {
        CouncilMetrics {
            accuracy,
            recent_performance: 0.6,
            consistency: 0.7,
            calibration: 0.7,
            specialization: 0.7,
        }
    }

    #[test]
    fn composite_uses_documented_weights() {
        let m = CouncilMetrics {
            accuracy: 1.0,
            recent_performance: 0.0,
            consistency: 0.0,
            calibration: 0.0,
            specialization: 0.0,
        };
        assert!((m.composite() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn top_k_by_composite() {
        let candidates = vec![
            candidate(metrics(0.50), true),
            candidate(metrics(0.70), true),
            candidate(metrics(0.60), true),
        ];
        let picked = rank_candidates(&candidates, 2);
        assert_eq!(picked.len(), 2);
        let best = candidates
            .iter()
            .max_by(|a, b| a.metrics.accuracy.total_cmp(&b.metrics.accuracy))
            .map(|c| c.expert_id);
        assert_eq!(picked.first().copied(), best);
    }

    // -----------------------------------------------------------------------
    // Scenario F: eligibility is a prerequisite, not a component
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_f_ineligible_expert_excluded_regardless_of_score() {
        let shared = CouncilMetrics {
            accuracy: 0.62,
            recent_performance: 0.68,
            consistency: 0.80,
            calibration: 0.72,
            specialization: 0.75,
        };
        // Expert X: schema validity 0.97 broke the gate.
        let x = candidate(shared, false);
        // Expert Y: identical metrics, gate intact.
        let y = candidate(shared, true);

        let picked = rank_candidates(&[x.clone(), y.clone()], 5);
        assert!(picked.contains(&y.expert_id));
        assert!(!picked.contains(&x.expert_id));
    }

    #[test]
    fn eliminated_experts_never_selected() {
        let mut c = candidate(metrics(0.9), true);
        c.eliminated = true;
        assert!(rank_candidates(&[c], 5).is_empty());
    }

    #[test]
    fn thin_history_excluded() {
        let mut c = candidate(metrics(0.9), true);
        c.prediction_count = 3;
        assert!(rank_candidates(&[c], 5).is_empty());
    }

    #[test]
    fn council_may_shrink_below_k() {
        let candidates = vec![candidate(metrics(0.6), true), candidate(metrics(0.5), false)];
        let picked = rank_candidates(&candidates, 5);
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn tie_break_prefers_recent_performance() {
        // Both composites are 0.67; recency is traded against calibration
        // so the tie-break has to do the work.
        let mut a = candidate(metrics(0.6), true);
        a.metrics = CouncilMetrics {
            accuracy: 0.6,
            recent_performance: 0.8,
            consistency: 0.7,
            calibration: 0.5,
            specialization: 0.7,
        };
        let mut b = candidate(metrics(0.6), true);
        b.metrics = CouncilMetrics {
            accuracy: 0.6,
            recent_performance: 0.6,
            consistency: 0.7,
            calibration: 1.0,
            specialization: 0.7,
        };
        assert!((a.metrics.composite() - b.metrics.composite()).abs() < 1e-12);

        let picked = rank_candidates(&[b.clone(), a.clone()], 1);
        assert_eq!(picked.first().copied(), Some(a.expert_id));
    }

    #[test]
    fn selection_runs_once_per_run_week() {
        let mut selector = CouncilSelector::new();
        let run = RunId::new();
        let candidates = vec![candidate(metrics(0.6), true)];

        let first = selector.select(run, 3, &candidates, 5, Utc::now());
        assert!(first.is_ok());

        let second = selector.select(run, 3, &candidates, 5, Utc::now());
        assert!(matches!(second, Err(CoreError::SelectionAlreadyRan { .. })));

        // A different week for the same run is fine.
        let other_week = selector.select(run, 4, &candidates, 5, Utc::now());
        assert!(other_week.is_ok());
    }

    #[test]
    fn guard_restores_from_persisted_selections() {
        let run = RunId::new();
        let mut selector = CouncilSelector::with_completed([(run, 1)]);
        let result = selector.select(run, 1, &[], 5, Utc::now());
        assert!(matches!(result, Err(CoreError::SelectionAlreadyRan { .. })));
    }
}
