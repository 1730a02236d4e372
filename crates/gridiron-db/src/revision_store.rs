//! Belief revision persistence.
//!
//! Revisions are immutable audit records: written once when the detector
//! fires, read back for analysis. The queryable identity columns sit
//! next to a JSONB payload carrying the full causal chain.

use sqlx::PgPool;

use gridiron_types::{BeliefRevision, ExpertId, GameId, RunId};

use crate::error::DbError;

/// Operations on the `belief_revisions` table.
pub struct RevisionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RevisionStore<'a> {
    /// Create a revision store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist one revision.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store(&self, revision: &BeliefRevision) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO belief_revisions
                  (revision_id, run_id, expert_id, game_id, revision_type,
                   trigger, confidence_delta, impact_score, payload, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(revision.revision_id.into_inner())
        .bind(revision.run_id.into_inner())
        .bind(revision.expert_id.into_inner())
        .bind(revision.game_id.into_inner())
        .bind(enum_str(&revision.revision_type)?)
        .bind(enum_str(&revision.trigger)?)
        .bind(revision.confidence_delta)
        .bind(revision.impact_score)
        .bind(serde_json::to_value(revision)?)
        .bind(revision.created_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(
            revision_id = %revision.revision_id,
            revision_type = ?revision.revision_type,
            "belief revision stored"
        );
        Ok(())
    }

    /// All revisions for one `(expert, game)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn for_expert_game(
        &self,
        run_id: RunId,
        expert_id: ExpertId,
        game_id: GameId,
    ) -> Result<Vec<BeliefRevision>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM belief_revisions
              WHERE run_id = $1 AND expert_id = $2 AND game_id = $3
              ORDER BY created_at",
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
}

/// Serialize an enum to its snake_case database string.
fn enum_str<T: serde::Serialize>(value: &T) -> Result<String, DbError> {
    let json = serde_json::to_value(value)?;
    json.as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| DbError::RowConversion(String::from("enum did not serialize to a string")))
}
