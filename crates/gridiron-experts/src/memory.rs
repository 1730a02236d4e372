//! Memory retrieval scoring and memory influence on confidence.
//!
//! The database pre-filters candidate memories (owner, run, age under a
//! year, decay above the floor) and computes raw embedding similarity
//! where the vector index can; this module owns the *blending*:
//!
//! ```text
//! score = (sim * (1 - alpha) + recency * alpha) * quality * boost
//! quality = 0.5 + 0.3 * vividness + 0.2 * decay
//! boost   = 1 + min(0.2, 0.02 * retrieval_count)
//! recency = exp(ln(0.5) * age_days / 90)      // 90-day half-life
//! ```
//!
//! `alpha` defaults to 0.8 -- retrieval favors recency. K defaults to 15
//! and adapts downward under latency pressure. When an embedding is
//! absent, similarity falls back to a weighted substring match over the
//! memory text.
//!
//! Retrieved memories then nudge the expert's confidence, bounded to
//! +-15% absolute, with the final confidence clamped to [0.10, 0.95].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gridiron_types::{EmotionalState, EpisodicMemory};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default recency/similarity blend weight (favors recency).
pub const DEFAULT_ALPHA: f64 = 0.8;

/// Default number of memories to retrieve.
pub const DEFAULT_K: usize = 15;

/// Memories with decay at or below this floor are not retrievable.
pub const MIN_DECAY: f64 = 0.1;

/// Memories older than this never surface.
pub const MAX_AGE_DAYS: i64 = 365;

/// Half-life of the recency score, in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 90.0;

/// Retrieval tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Recency blend weight in [0, 1].
    pub alpha: f64,
    /// Number of memories to return.
    pub k: usize,
    /// Smallest K the latency governor may shrink to.
    pub k_floor: usize,
    /// Retrieval latency budget in milliseconds.
    pub latency_budget_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            k: DEFAULT_K,
            k_floor: 5,
            latency_budget_ms: 100,
        }
    }
}

impl RetrievalConfig {
    /// K adapted to observed retrieval latency.
    ///
    /// When the recent p95 exceeds the budget, K halves (never below the
    /// floor); comfortably under budget keeps the configured K.
    pub fn adaptive_k(&self, recent_p95_ms: u64) -> usize {
        if recent_p95_ms > self.latency_budget_ms {
            (self.k / 2).max(self.k_floor)
        } else {
            self.k
        }
    }
}

// ---------------------------------------------------------------------------
// Score components
// ---------------------------------------------------------------------------

/// Cosine similarity between two vectors, mapped to [0, 1].
///
/// Returns 0.5 (neutral) for mismatched or zero-length vectors.
pub fn embedding_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.5;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.5;
    }
    let cosine = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

/// Weighted substring similarity, the fallback when no embedding exists.
///
/// Query tokens of three or more characters are matched case-insensitively
/// against the memory's text; each token contributes weight proportional
/// to its length, so "quarterback" matching counts for more than "cold".
pub fn text_similarity(query: &str, memory_text: &str) -> f64 {
    let haystack = memory_text.to_lowercase();
    let mut total_weight = 0_usize;
    let mut matched_weight = 0_usize;

    for token in query.to_lowercase().split_whitespace() {
        if token.len() < 3 {
            continue;
        }
        total_weight = total_weight.saturating_add(token.len());
        if haystack.contains(token) {
            matched_weight = matched_weight.saturating_add(token.len());
        }
    }

    if total_weight == 0 {
        return 0.0;
    }
    let matched = u32::try_from(matched_weight).unwrap_or(u32::MAX);
    let total = u32::try_from(total_weight).unwrap_or(u32::MAX);
    f64::from(matched) / f64::from(total)
}

/// Recency score with a 90-day half-life.
pub fn recency_score(age_days: f64) -> f64 {
    if age_days <= 0.0 {
        return 1.0;
    }
    (0.5_f64.ln() * age_days / RECENCY_HALF_LIFE_DAYS).exp()
}

/// Memory quality from vividness and decay.
pub fn quality(vividness: f64, decay: f64) -> f64 {
    0.5 + 0.3 * vividness + 0.2 * decay
}

/// Retrieval reinforcement boost, capped at +20%.
pub fn retrieval_boost(retrieval_count: u32) -> f64 {
    1.0 + (0.02 * f64::from(retrieval_count)).min(0.2)
}

/// The full blended retrieval score.
pub fn blended_score(
    similarity: f64,
    recency: f64,
    alpha: f64,
    vividness: f64,
    decay: f64,
    retrieval_count: u32,
) -> f64 {
    (similarity * (1.0 - alpha) + recency * alpha)
        * quality(vividness, decay)
        * retrieval_boost(retrieval_count)
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// The retrieval query: free text plus an optional embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Query text (game context summary).
    pub text: String,
    /// Query embedding, when the embeddings provider responded.
    pub embedding: Option<Vec<f32>>,
}

/// A memory with its retrieval score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    /// The memory.
    pub memory: EpisodicMemory,
    /// Blended retrieval score.
    pub score: f64,
    /// The similarity component that fed the score.
    pub similarity: f64,
    /// The recency component that fed the score.
    pub recency: f64,
}

/// Similarity of one memory to the query.
///
/// Uses the combined embedding when both sides have one; otherwise the
/// weighted substring fallback over the memory's summaries and lessons.
fn memory_similarity(memory: &EpisodicMemory, query: &RetrievalQuery) -> f64 {
    if let (Some(q), Some(m)) = (query.embedding.as_deref(), memory.combined_embedding.as_deref())
    {
        return embedding_similarity(q, m);
    }
    let text = format!(
        "{} {} {}",
        memory.prediction_summary,
        memory.outcome_summary,
        memory.lessons_learned.join(" ")
    );
    text_similarity(&query.text, &text)
}

/// Whether a memory passes the retrieval filters.
///
/// The database applies the same filters server-side; this is the
/// in-process authority the property tests drive.
pub fn passes_filters(memory: &EpisodicMemory, now: DateTime<Utc>) -> bool {
    if memory.decay <= MIN_DECAY {
        return false;
    }
    let age = now.signed_duration_since(memory.created_at);
    age.num_days() <= MAX_AGE_DAYS
}

/// Rank candidate memories against a query and return the top K.
///
/// Candidates failing the decay/age filters are dropped; survivors are
/// scored, sorted descending (ties broken by recency), and truncated to
/// `k`. Asking for more memories than exist returns all of them in
/// ranked order.
pub fn rank_memories(
    candidates: Vec<EpisodicMemory>,
    query: &RetrievalQuery,
    config: &RetrievalConfig,
    k: usize,
    now: DateTime<Utc>,
) -> Vec<ScoredMemory> {
    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .filter(|m| passes_filters(m, now))
        .map(|memory| {
            let similarity = memory_similarity(&memory, query);
            let age_days = now
                .signed_duration_since(memory.created_at)
                .num_seconds()
                .max(0);
            let age_days = f64::from(u32::try_from(age_days / 86_400).unwrap_or(u32::MAX));
            let recency = recency_score(age_days);
            let score = blended_score(
                similarity,
                recency,
                config.alpha,
                memory.vividness,
                memory.decay,
                memory.retrieval_count,
            );
            ScoredMemory {
                memory,
                score,
                similarity,
                recency,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.recency.total_cmp(&a.recency))
    });
    scored.truncate(k);
    scored
}

// ---------------------------------------------------------------------------
// Memory influence on confidence
// ---------------------------------------------------------------------------

/// Largest absolute confidence adjustment memories may apply.
pub const MAX_MEMORY_ADJUSTMENT: f64 = 0.15;

/// Floor on post-influence confidence.
pub const CONFIDENCE_FLOOR: f64 = 0.10;

/// Ceiling on post-influence confidence.
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Whether a memory records a successful call.
pub const fn is_success(memory: &EpisodicMemory) -> bool {
    matches!(
        memory.emotional_state,
        EmotionalState::Euphoria | EmotionalState::Satisfaction | EmotionalState::Vindication
    )
}

/// The bounded confidence adjustment implied by retrieved memories.
///
/// Rules, applied cumulatively then clamped to +-15%:
///
/// - overall success rate above 0.7 adds 5%, below 0.3 subtracts 5%
/// - base confidence above 0.7 with a majority of similar past wins adds
///   3%; a majority of losses subtracts 3%
/// - five or more memories agreeing at over 80% consistency add or
///   subtract a further 2% in the agreeing direction
pub fn memory_confidence_adjustment(base_confidence: f64, memories: &[ScoredMemory]) -> f64 {
    if memories.is_empty() {
        return 0.0;
    }

    let total = memories.len();
    let successes = memories.iter().filter(|m| is_success(&m.memory)).count();
    let success_rate = ratio(successes, total);

    let mut adjustment: f64 = 0.0;

    if success_rate > 0.7 {
        adjustment += 0.05;
    } else if success_rate < 0.3 {
        adjustment -= 0.05;
    }

    if base_confidence > 0.7 {
        if success_rate > 0.5 {
            adjustment += 0.03;
        } else if success_rate < 0.5 {
            adjustment -= 0.03;
        }
    }

    if total >= 5 {
        let consistency = success_rate.max(1.0 - success_rate);
        if consistency > 0.8 {
            if success_rate >= 0.5 {
                adjustment += 0.02;
            } else {
                adjustment -= 0.02;
            }
        }
    }

    adjustment.clamp(-MAX_MEMORY_ADJUSTMENT, MAX_MEMORY_ADJUSTMENT)
}

/// Apply memory influence to a base confidence.
///
/// The result is always inside [0.10, 0.95]: memories never push an
/// expert into degenerate certainty or despair.
pub fn apply_memory_influence(base_confidence: f64, memories: &[ScoredMemory]) -> f64 {
    let adjusted = base_confidence + memory_confidence_adjustment(base_confidence, memories);
    adjusted.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

/// Integer ratio as f64, safe for small counts.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let n = u32::try_from(numerator).unwrap_or(u32::MAX);
    let d = u32::try_from(denominator).unwrap_or(u32::MAX);
    f64::from(n) / f64::from(d)
}
