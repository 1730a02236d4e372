//! Reasoning chain construction and the write-only reasoning log.
//!
//! Every prediction leaves an audit trail: the ordered factor list with
//! weights and per-factor confidence, a personality-flavored monologue
//! derived from a small template set keyed by the dominant factor, the
//! confidence breakdown by bet category, and the aggregate confidence
//!
//! ```text
//! final_confidence = sum(weight * factor_confidence)  over weight > 0
//! ```
//!
//! The log is write-only during prediction and exposes an idempotent
//! `close()` so owning services can tear down cleanly.

use chrono::Utc;

use gridiron_types::{
    Archetype, BetCategory, CategoryConfidence, PersonalityProfile, PredictionBundle,
    ReasoningChain, ReasoningFactor,
};

use crate::error::ExpertError;

// ---------------------------------------------------------------------------
// Aggregate confidence
// ---------------------------------------------------------------------------

/// Weighted aggregate confidence over factors with positive weight.
pub fn aggregate_confidence(factors: &[ReasoningFactor]) -> f64 {
    factors
        .iter()
        .filter(|f| f.weight > 0.0)
        .map(|f| f.weight * f.confidence)
        .sum()
}

// ---------------------------------------------------------------------------
// Monologue templates
// ---------------------------------------------------------------------------

/// Base monologue line for a dominant factor.
///
/// Keyed by substring so `defensive_strength` and `defense_pressure`
/// share a template. Unrecognized factors get the generic line.
fn factor_template(factor: &str) -> &'static str {
    let f = factor.to_lowercase();
    if f.contains("defen") {
        "The defensive matchup decides this one"
    } else if f.contains("offen") || f.contains("scoring") {
        "The scoring edge is what I keep coming back to"
    } else if f.contains("weather") || f.contains("wind") {
        "Conditions are going to shape every drive"
    } else if f.contains("injur") {
        "The injury sheet changes the math here"
    } else if f.contains("momentum") || f.contains("streak") {
        "Momentum is real and one side has all of it"
    } else if f.contains("market") || f.contains("line") || f.contains("public") {
        "The number the market posted is telling on itself"
    } else if f.contains("history") || f.contains("head_to_head") {
        "These teams have a pattern and it repeats"
    } else {
        "One factor outweighs everything else on my board"
    }
}

/// Archetype flavor appended to the monologue.
const fn archetype_flavor(archetype: Archetype) -> &'static str {
    match archetype {
        Archetype::Gambler => "I'm swinging big on it.",
        Archetype::Rebel => "The crowd is on the other side, which suits me fine.",
        Archetype::Scholar => "The research backs it at every level.",
        Archetype::Specialist => "This sits squarely in my lane.",
        Archetype::Analyst => "The model agrees with the eye test for once.",
        Archetype::Veteran => "I've seen this exact setup before.",
        Archetype::Rookie => "Maybe that's bold, but I believe it.",
        Archetype::Conservative => "I'll take the measured position.",
        Archetype::Default => "That's where I land.",
    }
}

/// Compose the monologue for a chain.
fn monologue(dominant: &str, confidence: f64, archetype: Archetype) -> String {
    format!(
        "{} -- calling it at {:.0}% confidence. {}",
        factor_template(dominant),
        confidence * 100.0,
        archetype_flavor(archetype)
    )
}

// ---------------------------------------------------------------------------
// Chain construction
// ---------------------------------------------------------------------------

/// Build the reasoning chain for a bundle.
///
/// Factors are merged across the four core calls (duplicate names keep
/// the highest-weight occurrence), ordered by weight descending. Dominant
/// factors are those within 80% of the top weight.
pub fn build_chain(bundle: &PredictionBundle, profile: &PersonalityProfile) -> ReasoningChain {
    let mut factors: Vec<ReasoningFactor> = Vec::new();
    let core = [
        &bundle.winner.assertion,
        &bundle.spread.assertion,
        &bundle.total.assertion,
        &bundle.margin.assertion,
    ];
    for assertion in core {
        for f in &assertion.factors {
            match factors.iter_mut().find(|existing| existing.name == f.name) {
                Some(existing) => {
                    if f.weight > existing.weight {
                        existing.weight = f.weight;
                        existing.confidence = f.confidence;
                    }
                }
                None => factors.push(ReasoningFactor {
                    name: f.name.clone(),
                    weight: f.weight,
                    confidence: f.confidence,
                }),
            }
        }
    }
    factors.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    // Renormalize merged weights so the aggregate stays a convex blend.
    let weight_sum: f64 = factors.iter().map(|f| f.weight).sum();
    if weight_sum > 0.0 {
        for f in &mut factors {
            f.weight /= weight_sum;
        }
    }

    let top_weight = factors.first().map(|f| f.weight).unwrap_or(0.0);
    let dominant_factors: Vec<String> = factors
        .iter()
        .filter(|f| f.weight >= top_weight * 0.8 && f.weight > 0.0)
        .map(|f| f.name.clone())
        .collect();

    let final_confidence = aggregate_confidence(&factors);

    let confidence_breakdown: Vec<CategoryConfidence> = [
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
    .filter_map(|category| {
        bundle
            .category_confidence(category)
            .map(|confidence| CategoryConfidence {
                category,
                confidence,
            })
    })
    .collect();

    let dominant = dominant_factors
        .first()
        .cloned()
        .unwrap_or_else(|| String::from("overall_read"));

    ReasoningChain {
        prediction_id: bundle.prediction_id,
        expert_id: bundle.expert_id,
        game_id: bundle.game_id,
        monologue: monologue(&dominant, final_confidence, profile.archetype),
        factors,
        dominant_factors,
        confidence_breakdown,
        final_confidence,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Reasoning log
// ---------------------------------------------------------------------------

/// Write-only reasoning log for one prediction round.
///
/// Chains are appended during prediction and read back for audits and
/// reflection after the round. `close()` is idempotent; appends after
/// close are rejected.
#[derive(Debug, Default)]
pub struct ReasoningLog {
    chains: Vec<ReasoningChain>,
    closed: bool,
}

impl ReasoningLog {
    /// Create an empty open log.
    pub const fn new() -> Self {
        Self {
            chains: Vec::new(),
            closed: false,
        }
    }

    /// Append a chain.
    ///
    /// # Errors
    ///
    /// Returns [`ExpertError::LogClosed`] if the log has been closed.
    pub fn append(&mut self, chain: ReasoningChain) -> Result<(), ExpertError> {
        if self.closed {
            return Err(ExpertError::LogClosed);
        }
        self.chains.push(chain);
        Ok(())
    }

    /// All recorded chains, in append order.
    pub fn records(&self) -> &[ReasoningChain] {
        &self.chains
    }

    /// Number of recorded chains.
    pub const fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the log is empty.
    pub const fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Whether the log has been closed.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the log. Idempotent: closing twice is a no-op.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::debug!(chains = self.chains.len(), "reasoning log closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(name: &str, weight: f64, confidence: f64) -> ReasoningFactor {
        ReasoningFactor {
            name: String::from(name),
            weight,
            confidence,
        }
    }

    // -----------------------------------------------------------------------
    // Aggregate confidence
    // -----------------------------------------------------------------------

    #[test]
    fn aggregate_is_weighted_sum() {
        let factors = [factor("a", 0.6, 0.8), factor("b", 0.4, 0.5)];
        let agg = aggregate_confidence(&factors);
        assert!((agg - (0.6 * 0.8 + 0.4 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_factors_excluded() {
        let factors = [factor("a", 0.0, 0.9), factor("b", 1.0, 0.6)];
        let agg = aggregate_confidence(&factors);
        assert!((agg - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_factors_aggregate_to_zero() {
        assert!(aggregate_confidence(&[]).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // Monologue templates
    // -----------------------------------------------------------------------

    #[test]
    fn defensive_factor_selects_defense_template() {
        assert!(factor_template("defensive_strength").contains("defensive matchup"));
    }

    #[test]
    fn unknown_factor_gets_generic_template() {
        assert!(factor_template("lunar_cycle").contains("outweighs everything"));
    }

    #[test]
    fn monologue_carries_confidence_and_flavor() {
        let text = monologue("weather_edge", 0.72, Archetype::Gambler);
        assert!(text.contains("72%"));
        assert!(text.contains("swinging big"));
    }

    // -----------------------------------------------------------------------
    // Reasoning log lifecycle
    // -----------------------------------------------------------------------

    fn dummy_chain() -> ReasoningChain {
        ReasoningChain {
            prediction_id: gridiron_types::PredictionId::new(),
            expert_id: gridiron_types::ExpertId::new(),
            game_id: gridiron_types::GameId::new(),
            factors: vec![factor("momentum", 1.0, 0.6)],
            monologue: String::from("test"),
            dominant_factors: vec![String::from("momentum")],
            confidence_breakdown: Vec::new(),
            final_confidence: 0.6,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn append_then_read_back() {
        let mut log = ReasoningLog::new();
        assert!(log.append(dummy_chain()).is_ok());
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let mut log = ReasoningLog::new();
        log.close();
        log.close();
        assert!(log.is_closed());
    }

    #[test]
    fn append_after_close_rejected() {
        let mut log = ReasoningLog::new();
        log.close();
        assert!(matches!(log.append(dummy_chain()), Err(ExpertError::LogClosed)));
    }

    #[test]
    fn records_survive_close() {
        let mut log = ReasoningLog::new();
        let _ = log.append(dummy_chain());
        log.close();
        assert_eq!(log.records().len(), 1);
    }
}
