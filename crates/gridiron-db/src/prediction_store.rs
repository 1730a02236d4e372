//! Prediction, reasoning-chain, and UDV snapshot persistence.
//!
//! Bundles and chains are stored as JSONB payloads next to their queryable
//! identity columns: the schema validated the shape before anything got
//! here, so the database treats the payload as opaque and the columns as
//! the query surface. Predictions are never overwritten -- a later bundle
//! for the same `(expert, game)` is a new row the revision detector
//! compares against the prior one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gridiron_types::{
    BundleStatus, ExpertId, GameId, PredictionBundle, PredictionId, ReasoningChain, RunId,
    SnapshotId, UniversalGameData,
};

use crate::error::DbError;

/// Operations on the `predictions`, `reasoning_chains`, and
/// `universal_game_data_snapshots` tables.
pub struct PredictionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PredictionStore<'a> {
    /// Create a prediction store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // UDV snapshots
    // -----------------------------------------------------------------------

    /// Persist a UDV snapshot (content-addressed, superseded never
    /// mutated).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_snapshot(&self, udv: &UniversalGameData) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO universal_game_data_snapshots
                  (snapshot_id, game_id, snapshot_time, content_hash, payload, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (snapshot_id) DO NOTHING",
        )
        .bind(udv.snapshot_id.into_inner())
        .bind(udv.game_id.into_inner())
        .bind(udv.snapshot_time)
        .bind(udv.content_hash())
        .bind(serde_json::to_value(udv)?)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Load a UDV snapshot by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure or a missing row.
    pub async fn get_snapshot(&self, snapshot_id: SnapshotId) -> Result<UniversalGameData, DbError> {
        let row: (serde_json::Value,) = sqlx::query_as(
            r"SELECT payload FROM universal_game_data_snapshots WHERE snapshot_id = $1",
        )
        .bind(snapshot_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(serde_json::from_value(row.0)?)
    }

    /// The newest snapshot for a game, if any exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_snapshot(
        &self,
        game_id: GameId,
    ) -> Result<Option<UniversalGameData>, DbError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM universal_game_data_snapshots
              WHERE game_id = $1
              ORDER BY snapshot_time DESC
              LIMIT 1",
        )
        .bind(game_id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        row.map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .transpose()
    }

    // -----------------------------------------------------------------------
    // Predictions
    // -----------------------------------------------------------------------

    /// Persist a prediction bundle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_bundle(
        &self,
        run_id: RunId,
        bundle: &PredictionBundle,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO predictions
                  (prediction_id, run_id, expert_id, game_id, snapshot_id,
                   profile_version, status, overall_confidence, payload, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(bundle.prediction_id.into_inner())
        .bind(run_id.into_inner())
        .bind(bundle.expert_id.into_inner())
        .bind(bundle.game_id.into_inner())
        .bind(bundle.snapshot_id.into_inner())
        .bind(i64::from(bundle.profile_version))
        .bind(status_str(bundle.status))
        .bind(bundle.overall_confidence)
        .bind(serde_json::to_value(bundle)?)
        .bind(bundle.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed generation so the SLO history is complete.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_failure(
        &self,
        run_id: RunId,
        expert_id: ExpertId,
        game_id: GameId,
        snapshot_id: SnapshotId,
        reason: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO predictions
                  (prediction_id, run_id, expert_id, game_id, snapshot_id,
                   profile_version, status, overall_confidence, payload, created_at)
              VALUES ($1, $2, $3, $4, $5, 0, $6, 0.0, $7, $8)",
        )
        .bind(PredictionId::new().into_inner())
        .bind(run_id.into_inner())
        .bind(expert_id.into_inner())
        .bind(game_id.into_inner())
        .bind(snapshot_id.into_inner())
        .bind(status_str(BundleStatus::GenerationFailed))
        .bind(serde_json::json!({ "reason": reason }))
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The two most recent generated bundles for an `(expert, game)`,
    /// newest first -- the revision detector's input.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_two(
        &self,
        run_id: RunId,
        expert_id: ExpertId,
        game_id: GameId,
    ) -> Result<Vec<PredictionBundle>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM predictions
              WHERE run_id = $1 AND expert_id = $2 AND game_id = $3
                AND status = 'generated'
              ORDER BY created_at DESC
              LIMIT 2",
        )
        .bind(run_id.into_inner())
        .bind(expert_id.into_inner())
        .bind(game_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    /// All generated bundles for one game in a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn bundles_for_game(
        &self,
        run_id: RunId,
        game_id: GameId,
    ) -> Result<Vec<PredictionBundle>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT DISTINCT ON (expert_id) payload FROM predictions
              WHERE run_id = $1 AND game_id = $2 AND status = 'generated'
              ORDER BY expert_id, created_at DESC",
        )
        .bind(run_id.into_inner())
        .bind(game_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Reasoning chains
    // -----------------------------------------------------------------------

    /// Persist a reasoning chain for audit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_chain(&self, run_id: RunId, chain: &ReasoningChain) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO reasoning_chains
                  (prediction_id, run_id, expert_id, game_id, final_confidence,
                   payload, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(chain.prediction_id.into_inner())
        .bind(run_id.into_inner())
        .bind(chain.expert_id.into_inner())
        .bind(chain.game_id.into_inner())
        .bind(chain.final_confidence)
        .bind(serde_json::to_value(chain)?)
        .bind(chain.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Load the chain behind a prediction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure or a missing row.
    pub async fn get_chain(&self, prediction_id: PredictionId) -> Result<ReasoningChain, DbError> {
        let row: (serde_json::Value,) = sqlx::query_as(
            r"SELECT payload FROM reasoning_chains WHERE prediction_id = $1",
        )
        .bind(prediction_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(serde_json::from_value(row.0)?)
    }
}

/// Row describing an expert's recent operational record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PredictionCountRow {
    /// The expert.
    pub expert_id: Uuid,
    /// Generated bundles in the window.
    pub generated: i64,
    /// Failed generations in the window.
    pub failed: i64,
}

impl<'a> PredictionStore<'a> {
    /// Per-expert generated/failed counts inside a time window.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn counts_since(
        &self,
        run_id: RunId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionCountRow>, DbError> {
        let rows = sqlx::query_as::<_, PredictionCountRow>(
            r"SELECT expert_id,
                     COUNT(*) FILTER (WHERE status = 'generated') AS generated,
                     COUNT(*) FILTER (WHERE status = 'generation_failed') AS failed
              FROM predictions
              WHERE run_id = $1 AND created_at >= $2
              GROUP BY expert_id",
        )
        .bind(run_id.into_inner())
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// The database string for a bundle status.
const fn status_str(status: BundleStatus) -> &'static str {
    match status {
        BundleStatus::Generated => "generated",
        BundleStatus::GenerationFailed => "generation_failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_schema() {
        assert_eq!(status_str(BundleStatus::Generated), "generated");
        assert_eq!(status_str(BundleStatus::GenerationFailed), "generation_failed");
    }
}
