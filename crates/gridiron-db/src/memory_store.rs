//! Episodic memory persistence and vector retrieval.
//!
//! The `memories` table carries three `vector(1536)` columns (content,
//! context, combined) with an HNSW cosine index on the combined
//! embedding. Retrieval filters server-side (owner, run, age under a
//! year, decay above the floor), orders by cosine distance when a query
//! embedding exists, and hands the candidates to the in-process blender
//! for the recency/quality scoring pass.
//!
//! The store is append-only: a memory's deterministic ID is its identity
//! and re-storing the same ID is rejected. Only `decay` and
//! `retrieval_count` ever change after insert.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gridiron_types::{EpisodicMemory, ExpertId, GameId, MemoryId, RunId};

use crate::error::DbError;

/// Candidate pool size handed to the in-process blender.
const CANDIDATE_POOL: i64 = 200;

/// Operations on the `memories` table.
pub struct MemoryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MemoryStore<'a> {
    /// Create a memory store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one memory. Returns its deterministic ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateMemory`] when the deterministic ID
    /// already exists (the store is append-only).
    pub async fn store(&self, memory: &EpisodicMemory) -> Result<MemoryId, DbError> {
        let result = sqlx::query(
            r"INSERT INTO memories (
                  memory_id, expert_id, game_id, run_id, memory_type,
                  emotional_state, prediction_summary, outcome_summary,
                  contextual_factors, lessons_learned, emotional_intensity,
                  vividness, decay, retrieval_count,
                  content_embedding, context_embedding, combined_embedding,
                  created_at
              )
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                      $15::vector, $16::vector, $17::vector, $18)
              ON CONFLICT (memory_id) DO NOTHING",
        )
        .bind(memory.memory_id.into_inner())
        .bind(memory.expert_id.into_inner())
        .bind(memory.game_id.into_inner())
        .bind(memory.run_id.into_inner())
        .bind(enum_str(&memory.memory_type)?)
        .bind(enum_str(&memory.emotional_state)?)
        .bind(&memory.prediction_summary)
        .bind(&memory.outcome_summary)
        .bind(&memory.contextual_factors)
        .bind(&memory.lessons_learned)
        .bind(memory.emotional_intensity)
        .bind(memory.vividness)
        .bind(memory.decay)
        .bind(i32::try_from(memory.retrieval_count).unwrap_or(i32::MAX))
        .bind(memory.content_embedding.as_deref().map(vector_literal))
        .bind(memory.context_embedding.as_deref().map(vector_literal))
        .bind(memory.combined_embedding.as_deref().map(vector_literal))
        .bind(memory.created_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::DuplicateMemory(memory.memory_id));
        }

        tracing::debug!(memory_id = %memory.memory_id, expert_id = %memory.expert_id, "memory stored");
        Ok(memory.memory_id)
    }

    /// Fetch retrieval candidates for one expert and run.
    ///
    /// Server-side filters mirror the retrieval contract: same expert
    /// and run, younger than a year, decay above 0.1. With a query
    /// embedding the candidates come back ordered by cosine distance on
    /// the combined embedding (HNSW index); without one, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn candidates(
        &self,
        expert_id: ExpertId,
        run_id: RunId,
        query_embedding: Option<&[f32]>,
        now: DateTime<Utc>,
    ) -> Result<Vec<EpisodicMemory>, DbError> {
        let rows: Vec<MemoryRow> = match query_embedding {
            Some(embedding) => {
                sqlx::query_as::<_, MemoryRow>(
                    r"SELECT memory_id, expert_id, game_id, run_id, memory_type,
                             emotional_state, prediction_summary, outcome_summary,
                             contextual_factors, lessons_learned, emotional_intensity,
                             vividness, decay, retrieval_count,
                             combined_embedding::text AS combined_embedding_text,
                             created_at
                      FROM memories
                      WHERE expert_id = $1 AND run_id = $2
                        AND created_at > $3 - interval '1 year'
                        AND decay > 0.1
                      ORDER BY combined_embedding <=> $4::vector NULLS LAST
                      LIMIT $5",
                )
                .bind(expert_id.into_inner())
                .bind(run_id.into_inner())
                .bind(now)
                .bind(vector_literal(embedding))
                .bind(CANDIDATE_POOL)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MemoryRow>(
                    r"SELECT memory_id, expert_id, game_id, run_id, memory_type,
                             emotional_state, prediction_summary, outcome_summary,
                             contextual_factors, lessons_learned, emotional_intensity,
                             vividness, decay, retrieval_count,
                             combined_embedding::text AS combined_embedding_text,
                             created_at
                      FROM memories
                      WHERE expert_id = $1 AND run_id = $2
                        AND created_at > $3 - interval '1 year'
                        AND decay > 0.1
                      ORDER BY created_at DESC
                      LIMIT $4",
                )
                .bind(expert_id.into_inner())
                .bind(run_id.into_inner())
                .bind(now)
                .bind(CANDIDATE_POOL)
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(MemoryRow::into_memory).collect()
    }

    /// Increment retrieval counts for the memories a retrieval returned.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_retrieved(&self, ids: &[MemoryId]) -> Result<(), DbError> {
        if ids.is_empty() {
            return Ok(());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        sqlx::query(
            r"UPDATE memories
              SET retrieval_count = retrieval_count + 1
              WHERE memory_id = ANY($1)",
        )
        .bind(&uuids)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The periodic decay batch.
    ///
    /// Rarely-retrieved memories weaken; frequently-retrieved memories
    /// strengthen back toward full vividness. Decay stays in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn run_decay_batch(
        &self,
        run_id: RunId,
        weaken_by: f64,
        strengthen_by: f64,
        retrieval_threshold: i32,
    ) -> Result<u64, DbError> {
        let weakened = sqlx::query(
            r"UPDATE memories
              SET decay = GREATEST(0.0, decay - $1)
              WHERE run_id = $2 AND retrieval_count < $3",
        )
        .bind(weaken_by)
        .bind(run_id.into_inner())
        .bind(retrieval_threshold)
        .execute(self.pool)
        .await?;

        let strengthened = sqlx::query(
            r"UPDATE memories
              SET decay = LEAST(1.0, decay + $1)
              WHERE run_id = $2 AND retrieval_count >= $3",
        )
        .bind(strengthen_by)
        .bind(run_id.into_inner())
        .bind(retrieval_threshold)
        .execute(self.pool)
        .await?;

        let touched = weakened
            .rows_affected()
            .saturating_add(strengthened.rows_affected());
        tracing::info!(run_id = %run_id, touched, "memory decay batch complete");
        Ok(touched)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// A row from the `memories` table.
#[derive(Debug, sqlx::FromRow)]
struct MemoryRow {
    memory_id: Uuid,
    expert_id: Uuid,
    game_id: Uuid,
    run_id: Uuid,
    memory_type: String,
    emotional_state: String,
    prediction_summary: String,
    outcome_summary: String,
    contextual_factors: Vec<String>,
    lessons_learned: Vec<String>,
    emotional_intensity: f64,
    vividness: f64,
    decay: f64,
    retrieval_count: i32,
    combined_embedding_text: Option<String>,
    created_at: DateTime<Utc>,
}

impl MemoryRow {
    fn into_memory(self) -> Result<EpisodicMemory, DbError> {
        Ok(EpisodicMemory {
            memory_id: MemoryId::from(self.memory_id),
            expert_id: ExpertId::from(self.expert_id),
            game_id: GameId::from(self.game_id),
            run_id: RunId::from(self.run_id),
            memory_type: enum_from_str(&self.memory_type)?,
            emotional_state: enum_from_str(&self.emotional_state)?,
            prediction_summary: self.prediction_summary,
            outcome_summary: self.outcome_summary,
            contextual_factors: self.contextual_factors,
            lessons_learned: self.lessons_learned,
            emotional_intensity: self.emotional_intensity,
            vividness: self.vividness,
            decay: self.decay,
            retrieval_count: u32::try_from(self.retrieval_count).unwrap_or(0),
            content_embedding: None,
            context_embedding: None,
            combined_embedding: self
                .combined_embedding_text
                .as_deref()
                .map(parse_vector_literal)
                .transpose()?,
            created_at: self.created_at,
        })
    }
}

/// Serialize an enum to its snake_case database string.
fn enum_str<T: serde::Serialize>(value: &T) -> Result<String, DbError> {
    let json = serde_json::to_value(value)?;
    json.as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| DbError::RowConversion(String::from("enum did not serialize to a string")))
}

/// Deserialize an enum from its snake_case database string.
fn enum_from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_owned()))
        .map_err(|e| DbError::RowConversion(format!("bad enum value {s}: {e}")))
}

/// Format a vector as a pgvector literal: `[0.1,0.2,...]`.
fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len().saturating_mul(10).saturating_add(2));
    out.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

/// Parse a pgvector text representation back into a vector.
fn parse_vector_literal(text: &str) -> Result<Vec<f32>, DbError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| DbError::RowConversion(format!("bad vector literal: {text}")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| DbError::RowConversion(format!("bad vector component: {e}")))
        })
        .collect()
}
