//! The per-expert eligibility gate.
//!
//! Council participation is earned with operational discipline, not just
//! accuracy. Every prediction attempt records whether the bundle passed
//! schema validation and how long generation took; the gate keeps a
//! rolling window and recomputes after every sample. An expert below
//! either SLO is excluded from council selection until both recover.
//!
//! Targets: schema validity rate at least 0.985, average response time
//! at most 6000 ms.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use gridiron_types::ExpertId;

/// Minimum schema validity rate to sit on the council.
pub const SCHEMA_VALIDITY_TARGET: f64 = 0.985;

/// Maximum average response time in milliseconds.
pub const LATENCY_TARGET_MS: u64 = 6_000;

/// Rolling window of samples the gate evaluates over.
pub const WINDOW: usize = 50;

/// One prediction attempt's operational sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSample {
    /// Whether the bundle validated against the schema.
    pub schema_valid: bool,
    /// End-to-end generation time in milliseconds.
    pub response_ms: u64,
}

/// The rolling eligibility gate for one expert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityGate {
    /// The gated expert.
    pub expert_id: ExpertId,
    /// Rolling samples, oldest first, capped at [`WINDOW`].
    history: VecDeque<GateSample>,
    /// Current schema validity rate over the window.
    pub schema_validity_rate: f64,
    /// Current average response time over the window.
    pub avg_response_time_ms: f64,
    /// Whether both SLOs currently hold.
    pub eligible: bool,
}

impl EligibilityGate {
    /// A fresh gate with no history. An expert with no samples is
    /// eligible: it has not yet broken either SLO.
    pub fn fresh(expert_id: ExpertId) -> Self {
        Self {
            expert_id,
            history: VecDeque::new(),
            schema_validity_rate: 1.0,
            avg_response_time_ms: 0.0,
            eligible: true,
        }
    }

    /// Restore a gate from persisted samples.
    pub fn from_samples(expert_id: ExpertId, samples: Vec<GateSample>) -> Self {
        let mut gate = Self::fresh(expert_id);
        for sample in samples {
            gate.record(sample);
        }
        gate
    }

    /// Record one sample and recompute the SLOs.
    pub fn record(&mut self, sample: GateSample) {
        if self.history.len() >= WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(sample);
        self.recompute();
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    fn recompute(&mut self) {
        let total = self.history.len();
        if total == 0 {
            self.schema_validity_rate = 1.0;
            self.avg_response_time_ms = 0.0;
            self.eligible = true;
            return;
        }

        let valid = self.history.iter().filter(|s| s.schema_valid).count();
        let ms_sum: u64 = self.history.iter().map(|s| s.response_ms).sum();

        let total_f = f64::from(u32::try_from(total).unwrap_or(u32::MAX));
        let valid_f = f64::from(u32::try_from(valid).unwrap_or(u32::MAX));
        self.schema_validity_rate = valid_f / total_f;
        let avg_ms = ms_sum
            .checked_div(u64::try_from(total).unwrap_or(1))
            .unwrap_or(0);
        self.avg_response_time_ms = f64::from(u32::try_from(avg_ms).unwrap_or(u32::MAX));

        let was_eligible = self.eligible;
        self.eligible = self.schema_validity_rate >= SCHEMA_VALIDITY_TARGET
            && self.avg_response_time_ms <= f64::from(u32::try_from(LATENCY_TARGET_MS).unwrap_or(u32::MAX));

        if was_eligible && !self.eligible {
            tracing::warn!(
                expert_id = %self.expert_id,
                schema_validity_rate = self.schema_validity_rate,
                avg_response_time_ms = self.avg_response_time_ms,
                "expert dropped below eligibility SLOs"
            );
        } else if !was_eligible && self.eligible {
            tracing::info!(
                expert_id = %self.expert_id,
                "expert recovered eligibility"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_sample() -> GateSample {
        GateSample {
            schema_valid: true,
            response_ms: 1_500,
        }
    }

    #[test]
    fn fresh_gate_is_eligible() {
        let gate = EligibilityGate::fresh(ExpertId::new());
        assert!(gate.eligible);
        assert_eq!(gate.sample_count(), 0);
    }

    #[test]
    fn clean_history_stays_eligible() {
        let mut gate = EligibilityGate::fresh(ExpertId::new());
        for _ in 0..40 {
            gate.record(ok_sample());
        }
        assert!(gate.eligible);
        assert!((gate.schema_validity_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn schema_failures_break_eligibility() {
        // Scenario F input: validity 0.97 is below the 0.985 target.
        let mut gate = EligibilityGate::fresh(ExpertId::new());
        for i in 0..50_u32 {
            gate.record(GateSample {
                // 48/50 valid = 0.96 < 0.985.
                schema_valid: i >= 2,
                response_ms: 1_000,
            });
        }
        assert!(gate.schema_validity_rate < SCHEMA_VALIDITY_TARGET);
        assert!(!gate.eligible);
    }

    #[test]
    fn slow_responses_break_eligibility() {
        let mut gate = EligibilityGate::fresh(ExpertId::new());
        for _ in 0..10 {
            gate.record(GateSample {
                schema_valid: true,
                response_ms: 9_000,
            });
        }
        assert!(!gate.eligible);
    }

    #[test]
    fn eligibility_recovers_when_window_rolls_clean() {
        let mut gate = EligibilityGate::fresh(ExpertId::new());
        // Poison the gate.
        for _ in 0..5 {
            gate.record(GateSample {
                schema_valid: false,
                response_ms: 1_000,
            });
        }
        assert!(!gate.eligible);

        // A full clean window rolls the failures out.
        for _ in 0..WINDOW {
            gate.record(ok_sample());
        }
        assert!(gate.eligible);
    }

    #[test]
    fn window_is_capped() {
        let mut gate = EligibilityGate::fresh(ExpertId::new());
        for _ in 0..(WINDOW * 2) {
            gate.record(ok_sample());
        }
        assert_eq!(gate.sample_count(), WINDOW);
    }

    #[test]
    fn restore_from_samples_recomputes() {
        let samples = vec![
            GateSample { schema_valid: true, response_ms: 2_000 },
            GateSample { schema_valid: false, response_ms: 2_000 },
        ];
        let gate = EligibilityGate::from_samples(ExpertId::new(), samples);
        assert!((gate.schema_validity_rate - 0.5).abs() < f64::EPSILON);
        assert!(!gate.eligible);
    }
}
