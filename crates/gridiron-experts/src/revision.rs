//! The belief revision detector.
//!
//! Given two sequential prediction bundles for the same `(expert, game)`,
//! decides whether a revision occurred and classifies it. The rules are
//! evaluated strictly in order, so classification is deterministic:
//! recomputing from the same two bundles always returns the same type.
//!
//! 1. Top-level pick flips -> `complete_reversal`
//! 2. |dSpread| > 7 or |dTotal| > 10 -> `prediction_change`
//! 3. |dConfidence| > 0.2 -> `confidence_shift`
//! 4. Factor-list edit distance > 3 -> `reasoning_update`
//! 5. Any scalar shift > 10% of its prior value -> `nuanced_adjustment`
//! 6. Otherwise: no revision.
//!
//! The trigger is inferred from the delta between the two underlying UDV
//! snapshots; if no section changed the revision is `self_reflection`.
//! The causal chain is reconstructed from the snapshot delta, or
//! synthesized from the factor diff when no snapshots are available.

use chrono::{DateTime, Utc};

use gridiron_types::{
    BeliefRevision, CausalStep, EmotionalState, PredictionBundle, RevisionId, RevisionTrigger,
    RevisionType, RunId, UniversalGameData,
};

// ---------------------------------------------------------------------------
// Classification thresholds
// ---------------------------------------------------------------------------

/// Spread move that counts as a prediction change.
const SPREAD_CHANGE_THRESHOLD: f64 = 7.0;

/// Total move that counts as a prediction change.
const TOTAL_CHANGE_THRESHOLD: f64 = 10.0;

/// Confidence move that counts as a confidence shift.
const CONFIDENCE_SHIFT_THRESHOLD: f64 = 0.2;

/// Factor-list edit distance that counts as a reasoning update.
const FACTOR_EDIT_THRESHOLD: usize = 3;

/// Relative scalar drift that counts as a nuanced adjustment.
const SCALAR_DRIFT_FRACTION: f64 = 0.10;

// ---------------------------------------------------------------------------
// Edit distance
// ---------------------------------------------------------------------------

/// Levenshtein distance over two factor-name sequences.
fn factor_edit_distance(a: &[String], b: &[String]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len().saturating_add(1);
    let mut previous: Vec<usize> = (0..width).collect();
    let mut current: Vec<usize> = vec![0; width];

    for (i, a_item) in a.iter().enumerate() {
        if let Some(slot) = current.first_mut() {
            *slot = i.saturating_add(1);
        }
        for (j, b_item) in b.iter().enumerate() {
            let substitution_cost = usize::from(a_item != b_item);
            let deletion = previous.get(j.saturating_add(1)).copied().unwrap_or(usize::MAX);
            let insertion = current.get(j).copied().unwrap_or(usize::MAX);
            let substitution = previous.get(j).copied().unwrap_or(usize::MAX);

            let best = deletion
                .saturating_add(1)
                .min(insertion.saturating_add(1))
                .min(substitution.saturating_add(substitution_cost));

            if let Some(slot) = current.get_mut(j.saturating_add(1)) {
                *slot = best;
            }
        }
        core::mem::swap(&mut previous, &mut current);
    }

    previous.last().copied().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Relative drift of a scalar against its prior value.
fn relative_drift(original: f64, revised: f64) -> f64 {
    if original.abs() < f64::EPSILON {
        return if revised.abs() < f64::EPSILON { 0.0 } else { 1.0 };
    }
    (revised - original).abs() / original.abs()
}

/// Classify the change between two bundles, if any.
///
/// Rules are evaluated in severity order; the first match wins.
pub fn classify(original: &PredictionBundle, revised: &PredictionBundle) -> Option<RevisionType> {
    if original.winner.pick != revised.winner.pick {
        return Some(RevisionType::CompleteReversal);
    }

    let spread_delta = (revised.spread.spread_home - original.spread.spread_home).abs();
    let total_delta = (revised.total.total - original.total.total).abs();
    if spread_delta > SPREAD_CHANGE_THRESHOLD || total_delta > TOTAL_CHANGE_THRESHOLD {
        return Some(RevisionType::PredictionChange);
    }

    let confidence_delta = (revised.overall_confidence - original.overall_confidence).abs();
    if confidence_delta > CONFIDENCE_SHIFT_THRESHOLD {
        return Some(RevisionType::ConfidenceShift);
    }

    let edit = factor_edit_distance(&original.factor_names(), &revised.factor_names());
    if edit > FACTOR_EDIT_THRESHOLD {
        return Some(RevisionType::ReasoningUpdate);
    }

    let scalars = [
        (original.spread.spread_home, revised.spread.spread_home),
        (original.total.total, revised.total.total),
        (original.margin.margin_home, revised.margin.margin_home),
        (
            original.winner.win_probability_home,
            revised.winner.win_probability_home,
        ),
    ];
    if scalars
        .iter()
        .any(|(o, r)| relative_drift(*o, *r) > SCALAR_DRIFT_FRACTION)
    {
        return Some(RevisionType::NuancedAdjustment);
    }

    None
}

// ---------------------------------------------------------------------------
// Trigger inference and causal chain
// ---------------------------------------------------------------------------

/// Infer the trigger from the snapshot delta.
///
/// The largest (first in canonical order) changed section maps to its
/// trigger; no change at all means the expert revised on its own.
fn infer_trigger(
    original_udv: Option<&UniversalGameData>,
    revised_udv: Option<&UniversalGameData>,
) -> RevisionTrigger {
    match (original_udv, revised_udv) {
        (Some(before), Some(after)) => before
            .changed_sections(after)
            .first()
            .map_or(RevisionTrigger::SelfReflection, |section| section.trigger()),
        _ => RevisionTrigger::SelfReflection,
    }
}

/// Build the causal chain from the snapshot delta, or synthesize it from
/// the factor diff when no snapshots exist.
fn causal_chain(
    original: &PredictionBundle,
    revised: &PredictionBundle,
    original_udv: Option<&UniversalGameData>,
    revised_udv: Option<&UniversalGameData>,
) -> Vec<CausalStep> {
    if let (Some(before), Some(after)) = (original_udv, revised_udv) {
        let changed = before.changed_sections(after);
        if !changed.is_empty() {
            return changed
                .into_iter()
                .map(|section| CausalStep {
                    section: Some(section),
                    summary: format!(
                        "{:?} moved: {} -> {}",
                        section,
                        before.section_summary(section),
                        after.section_summary(section)
                    ),
                    observed_at: after.snapshot_time,
                })
                .collect();
        }
    }

    // No snapshot delta: synthesize from the reasoning diff.
    let before_names = original.factor_names();
    let after_names = revised.factor_names();
    let mut steps = Vec::new();
    for name in &after_names {
        if !before_names.contains(name) {
            steps.push(CausalStep {
                section: None,
                summary: format!("factor entered the reasoning: {name}"),
                observed_at: revised.created_at,
            });
        }
    }
    for name in &before_names {
        if !after_names.contains(name) {
            steps.push(CausalStep {
                section: None,
                summary: format!("factor dropped from the reasoning: {name}"),
                observed_at: revised.created_at,
            });
        }
    }
    if steps.is_empty() {
        steps.push(CausalStep {
            section: None,
            summary: String::from("re-read of the same information"),
            observed_at: revised.created_at,
        });
    }
    steps
}

// ---------------------------------------------------------------------------
// Impact score and emotional state
// ---------------------------------------------------------------------------

/// Impact in [0, 1]: severity, confidence move, and scalar moves blended.
fn impact_score(
    revision_type: RevisionType,
    confidence_delta: f64,
    original: &PredictionBundle,
    revised: &PredictionBundle,
) -> f64 {
    let spread_component =
        ((revised.spread.spread_home - original.spread.spread_home).abs() / 14.0).min(1.0);
    let total_component = ((revised.total.total - original.total.total).abs() / 20.0).min(1.0);
    let scalar_component = spread_component.max(total_component);
    let confidence_component = (confidence_delta.abs() / 0.5).min(1.0);

    (0.5 * revision_type.severity() + 0.3 * confidence_component + 0.2 * scalar_component)
        .clamp(0.0, 1.0)
}

/// Emotional state attached to a revision.
const fn revision_emotion(revision_type: RevisionType, confidence_delta: f64) -> EmotionalState {
    match revision_type {
        RevisionType::CompleteReversal => EmotionalState::Confusion,
        RevisionType::PredictionChange => EmotionalState::Surprise,
        RevisionType::ConfidenceShift => {
            if confidence_delta < 0.0 {
                EmotionalState::Disappointment
            } else {
                EmotionalState::Satisfaction
            }
        }
        RevisionType::ReasoningUpdate | RevisionType::NuancedAdjustment => EmotionalState::Neutral,
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detect and materialize a belief revision between two bundles.
///
/// Returns `None` when the bundles do not differ beyond the thresholds.
/// `original_udv`/`revised_udv` are the snapshots the two predictions
/// were made from, when available; they drive trigger inference and the
/// causal chain.
pub fn detect_revision(
    run_id: RunId,
    original: &PredictionBundle,
    revised: &PredictionBundle,
    original_udv: Option<&UniversalGameData>,
    revised_udv: Option<&UniversalGameData>,
    now: DateTime<Utc>,
) -> Option<BeliefRevision> {
    let revision_type = classify(original, revised)?;
    let confidence_delta = revised.overall_confidence - original.overall_confidence;

    let revision = BeliefRevision {
        revision_id: RevisionId::new(),
        run_id,
        expert_id: revised.expert_id,
        game_id: revised.game_id,
        revision_type,
        trigger: infer_trigger(original_udv, revised_udv),
        original_prediction: original.prediction_id,
        revised_prediction: revised.prediction_id,
        causal_chain: causal_chain(original, revised, original_udv, revised_udv),
        confidence_delta,
        impact_score: impact_score(revision_type, confidence_delta, original, revised),
        emotional_state: revision_emotion(revision_type, confidence_delta),
        created_at: now,
    };

    tracing::debug!(
        expert_id = %revision.expert_id,
        game_id = %revision.game_id,
        revision_type = ?revision.revision_type,
        trigger = ?revision.trigger,
        impact = revision.impact_score,
        "belief revision detected"
    );

    Some(revision)
}

#[cfg(test)]
mod tests {
    use gridiron_types::bundle::{
        Assertion, Factor, MarginCall, SpreadCall, TotalCall, WinnerCall,
    };
    use gridiron_types::{
        BundleStatus, ExpertId, GameId, PickSide, PredictionId, SnapshotId,
    };

    use super::*;

    fn assertion(confidence: f64, factor_names: &[&str]) -> Assertion {
        let count = factor_names.len();
        let weight = if count == 0 {
            0.0
        } else {
            1.0 / f64::from(u32::try_from(count).unwrap_or(1))
        };
        Assertion {
            confidence,
            reasoning: String::from("test"),
            factors: factor_names
                .iter()
                .map(|name| Factor {
                    name: String::from(*name),
                    weight,
                    confidence: 0.6,
                })
                .collect(),
        }
    }

    fn bundle(
        pick: PickSide,
        spread: f64,
        total: f64,
        confidence: f64,
        factors: &[&str],
    ) -> PredictionBundle {
        PredictionBundle {
            prediction_id: PredictionId::new(),
            expert_id: ExpertId::new(),
            game_id: GameId::new(),
            snapshot_id: SnapshotId::new(),
            profile_version: 1,
            status: BundleStatus::Generated,
            winner: WinnerCall {
                pick,
                win_probability_home: 0.6,
                win_probability_away: 0.4,
                assertion: assertion(confidence, factors),
            },
            spread: SpreadCall {
                spread_home: spread,
                assertion: assertion(confidence, &[]),
            },
            total: TotalCall {
                total,
                assertion: assertion(confidence, &[]),
            },
            margin: MarginCall {
                margin_home: 4.0,
                assertion: assertion(confidence, &[]),
            },
            periods: Vec::new(),
            team_stats: Vec::new(),
            player_props: Vec::new(),
            situational: Vec::new(),
            overall_confidence: confidence,
            created_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Rule order
    // -----------------------------------------------------------------------

    #[test]
    fn pick_flip_is_complete_reversal() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        let b = bundle(PickSide::Away, -3.0, 48.0, 0.7, &["momentum"]);
        assert_eq!(classify(&a, &b), Some(RevisionType::CompleteReversal));
    }

    #[test]
    fn big_spread_move_is_prediction_change() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        let b = bundle(PickSide::Home, -11.0, 48.0, 0.7, &["momentum"]);
        assert_eq!(classify(&a, &b), Some(RevisionType::PredictionChange));
    }

    #[test]
    fn big_total_move_is_prediction_change() {
        let a = bundle(PickSide::Home, -3.0, 40.0, 0.7, &["momentum"]);
        let b = bundle(PickSide::Home, -3.0, 51.0, 0.7, &["momentum"]);
        assert_eq!(classify(&a, &b), Some(RevisionType::PredictionChange));
    }

    // -----------------------------------------------------------------------
    // Scenario D: confidence shift
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_d_confidence_shift() {
        // Pick holds, spread moves half a point, confidence drops 0.22.
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.72, &["momentum"]);
        let b = bundle(PickSide::Home, -3.5, 48.0, 0.50, &["momentum"]);
        assert_eq!(classify(&a, &b), Some(RevisionType::ConfidenceShift));
    }

    #[test]
    fn factor_rewrite_is_reasoning_update() {
        let a = bundle(
            PickSide::Home,
            -3.0,
            48.0,
            0.7,
            &["momentum", "defense", "weather", "injuries"],
        );
        let b = bundle(
            PickSide::Home,
            -3.0,
            48.0,
            0.7,
            &["market", "history", "sentiment", "scheme"],
        );
        assert_eq!(classify(&a, &b), Some(RevisionType::ReasoningUpdate));
    }

    #[test]
    fn small_scalar_drift_is_nuanced_adjustment() {
        // Spread moves from -3.0 to -3.5: under rule 2, over 10% of prior.
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        let b = bundle(PickSide::Home, -3.5, 48.0, 0.7, &["momentum"]);
        assert_eq!(classify(&a, &b), Some(RevisionType::NuancedAdjustment));
    }

    #[test]
    fn identical_bundles_are_no_revision() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        let mut b = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        b.margin.margin_home = a.margin.margin_home;
        assert_eq!(classify(&a, &b), None);
    }

    // -----------------------------------------------------------------------
    // Property 4: determinism
    // -----------------------------------------------------------------------

    #[test]
    fn classification_is_deterministic() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.72, &["momentum"]);
        let b = bundle(PickSide::Home, -3.5, 48.0, 0.50, &["momentum"]);
        let first = classify(&a, &b);
        let second = classify(&a, &b);
        assert_eq!(first, second);
    }

    // -----------------------------------------------------------------------
    // Edit distance
    // -----------------------------------------------------------------------

    #[test]
    fn edit_distance_identical_is_zero() {
        let a = vec![String::from("x"), String::from("y")];
        assert_eq!(factor_edit_distance(&a, &a.clone()), 0);
    }

    #[test]
    fn edit_distance_counts_substitutions() {
        let a = vec![String::from("x"), String::from("y")];
        let b = vec![String::from("x"), String::from("z")];
        assert_eq!(factor_edit_distance(&a, &b), 1);
    }

    #[test]
    fn edit_distance_handles_empty() {
        let a: Vec<String> = Vec::new();
        let b = vec![String::from("x")];
        assert_eq!(factor_edit_distance(&a, &b), 1);
        assert_eq!(factor_edit_distance(&b, &a), 1);
    }

    // -----------------------------------------------------------------------
    // Detection: trigger, impact, causal chain
    // -----------------------------------------------------------------------

    #[test]
    fn detection_without_snapshots_is_self_reflection() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.72, &["momentum"]);
        let b = bundle(PickSide::Home, -3.5, 48.0, 0.50, &["momentum"]);
        let revision = detect_revision(RunId::new(), &a, &b, None, None, Utc::now());
        assert!(revision.as_ref().is_some_and(|r| r.trigger == RevisionTrigger::SelfReflection));
        assert!(revision.as_ref().is_some_and(|r| !r.causal_chain.is_empty()));
        assert!(revision.is_some_and(|r| (r.confidence_delta + 0.22).abs() < 1e-9));
    }

    #[test]
    fn impact_score_in_unit_interval() {
        let a = bundle(PickSide::Home, -3.0, 40.0, 0.9, &["momentum"]);
        let b = bundle(PickSide::Away, -12.0, 55.0, 0.3, &["market"]);
        let revision = detect_revision(RunId::new(), &a, &b, None, None, Utc::now());
        assert!(revision.is_some_and(|r| (0.0..=1.0).contains(&r.impact_score)));
    }

    #[test]
    fn no_revision_returns_none() {
        let a = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        let b = bundle(PickSide::Home, -3.0, 48.0, 0.7, &["momentum"]);
        assert!(detect_revision(RunId::new(), &a, &b, None, None, Utc::now()).is_none());
    }
}
