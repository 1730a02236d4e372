//! Council-candidate metric computation.
//!
//! The weekly selector needs five metrics per expert over the evaluation
//! window. They are derived from the settled-prediction learning events
//! (which carry the outcome score and confidence error) plus per-category
//! bet results:
//!
//! - accuracy: share of settled predictions scoring at least 0.5
//! - recent performance: the same share, exponentially weighted with a
//!   one-week half-life
//! - consistency: one minus the standard deviation of weekly accuracy
//! - calibration: one minus the mean squared confidence error (Brier)
//! - specialization: the best per-category win rate, supplied by the
//!   caller from the bet store

use chrono::{DateTime, Datelike, Utc};

use gridiron_core::CouncilMetrics;

/// One settled prediction's contribution to the metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettledSample {
    /// When the prediction settled.
    pub settled_at: DateTime<Utc>,
    /// The outcome score in [0, 1].
    pub score: f64,
    /// Absolute confidence error on the winner call.
    pub confidence_error: f64,
}

/// Half-life of the recency weighting, in days.
const RECENT_HALF_LIFE_DAYS: f64 = 7.0;

/// A prediction counts as a hit when its score clears this bar.
const HIT_THRESHOLD: f64 = 0.5;

/// Compute the five council metrics from an expert's window samples.
///
/// `specialization` is the expert's best per-category win rate, computed
/// by the caller from settled bets. Empty samples produce all-zero
/// metrics (the selector's minimum-prediction filter excludes such
/// experts anyway).
pub fn compute_metrics(
    samples: &[SettledSample],
    specialization: f64,
    now: DateTime<Utc>,
) -> CouncilMetrics {
    if samples.is_empty() {
        return CouncilMetrics {
            accuracy: 0.0,
            recent_performance: 0.0,
            consistency: 0.0,
            calibration: 0.0,
            specialization: specialization.clamp(0.0, 1.0),
        };
    }

    let n = f64::from(u32::try_from(samples.len()).unwrap_or(u32::MAX));

    let hits = samples.iter().filter(|s| s.score >= HIT_THRESHOLD).count();
    let accuracy = f64::from(u32::try_from(hits).unwrap_or(u32::MAX)) / n;

    // Exponentially-weighted recent performance.
    let mut weighted_hits = 0.0;
    let mut weight_sum = 0.0;
    for sample in samples {
        let age_days = age_in_days(sample.settled_at, now);
        let weight = (0.5_f64.ln() * age_days / RECENT_HALF_LIFE_DAYS).exp();
        weight_sum += weight;
        if sample.score >= HIT_THRESHOLD {
            weighted_hits += weight;
        }
    }
    let recent_performance = if weight_sum > 0.0 {
        weighted_hits / weight_sum
    } else {
        accuracy
    };

    // Consistency: 1 - stdev of weekly accuracy.
    let consistency = 1.0 - weekly_accuracy_stdev(samples);

    // Calibration: 1 - Brier (mean squared confidence error).
    let brier: f64 = samples
        .iter()
        .map(|s| s.confidence_error.powi(2))
        .sum::<f64>()
        / n;
    let calibration = (1.0 - brier).clamp(0.0, 1.0);

    CouncilMetrics {
        accuracy,
        recent_performance,
        consistency: consistency.clamp(0.0, 1.0),
        calibration,
        specialization: specialization.clamp(0.0, 1.0),
    }
}

/// Age of a sample in fractional days.
fn age_in_days(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = now.signed_duration_since(at).num_seconds().max(0);
    let secs = u32::try_from(secs.min(i64::from(u32::MAX))).unwrap_or(u32::MAX);
    f64::from(secs) / 86_400.0
}

/// Standard deviation of per-ISO-week hit rates.
fn weekly_accuracy_stdev(samples: &[SettledSample]) -> f64 {
    use std::collections::BTreeMap;

    let mut weeks: BTreeMap<(i32, u32), (u32, u32)> = BTreeMap::new();
    for sample in samples {
        let week = sample.settled_at.iso_week();
        let entry = weeks.entry((week.year(), week.week())).or_insert((0, 0));
        entry.1 = entry.1.saturating_add(1);
        if sample.score >= HIT_THRESHOLD {
            entry.0 = entry.0.saturating_add(1);
        }
    }

    if weeks.len() < 2 {
        return 0.0;
    }

    let rates: Vec<f64> = weeks
        .values()
        .map(|(hits, total)| {
            if *total == 0 {
                0.0
            } else {
                f64::from(*hits) / f64::from(*total)
            }
        })
        .collect();

    let n = f64::from(u32::try_from(rates.len()).unwrap_or(u32::MAX));
    let mean = rates.iter().sum::<f64>() / n;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(days_ago: i64, score: f64, error: f64) -> SettledSample {
        SettledSample {
            settled_at: Utc::now() - chrono::Duration::days(days_ago),
            score,
            confidence_error: error,
        }
    }

    #[test]
    fn empty_samples_zero_out() {
        let m = compute_metrics(&[], 0.6, Utc::now());
        assert!(m.accuracy.abs() < f64::EPSILON);
        assert!((m.specialization - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn accuracy_counts_hits() {
        let samples = [
            sample(1, 0.8, 0.2),
            sample(2, 0.7, 0.2),
            sample(3, 0.2, 0.5),
            sample(4, 0.3, 0.5),
        ];
        let m = compute_metrics(&samples, 0.5, Utc::now());
        assert!((m.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn recent_hits_weigh_heavier() {
        // Old hits, recent misses.
        let fading = [
            sample(1, 0.2, 0.5),
            sample(2, 0.2, 0.5),
            sample(20, 0.9, 0.1),
            sample(21, 0.9, 0.1),
        ];
        // Recent hits, old misses.
        let surging = [
            sample(1, 0.9, 0.1),
            sample(2, 0.9, 0.1),
            sample(20, 0.2, 0.5),
            sample(21, 0.2, 0.5),
        ];
        let now = Utc::now();
        let m_fading = compute_metrics(&fading, 0.5, now);
        let m_surging = compute_metrics(&surging, 0.5, now);
        assert!(m_surging.recent_performance > m_fading.recent_performance);
        // Plain accuracy is identical.
        assert!((m_surging.accuracy - m_fading.accuracy).abs() < 1e-9);
    }

    #[test]
    fn calibration_penalizes_confidence_error() {
        let sharp = [sample(1, 0.8, 0.1), sample(2, 0.8, 0.1)];
        let blunt = [sample(1, 0.8, 0.6), sample(2, 0.8, 0.6)];
        let now = Utc::now();
        let m_sharp = compute_metrics(&sharp, 0.5, now);
        let m_blunt = compute_metrics(&blunt, 0.5, now);
        assert!(m_sharp.calibration > m_blunt.calibration);
    }

    #[test]
    fn single_week_is_fully_consistent() {
        // Same-day samples always share an ISO week.
        let samples = [sample(1, 0.8, 0.2), sample(1, 0.3, 0.4)];
        let m = compute_metrics(&samples, 0.5, Utc::now());
        assert!((m.consistency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn erratic_weeks_lower_consistency() {
        // One perfect week, one empty-handed week.
        let samples = [
            sample(1, 0.9, 0.1),
            sample(2, 0.9, 0.1),
            sample(9, 0.1, 0.6),
            sample(10, 0.1, 0.6),
        ];
        let m = compute_metrics(&samples, 0.5, Utc::now());
        assert!(m.consistency < 1.0);
    }
}
