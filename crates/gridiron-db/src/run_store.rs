//! Run metadata, expert profiles, gates, calibration, learning events,
//! and council selections.
//!
//! Everything a run needs to resume lives here. Profiles are versioned
//! snapshots: the learning coordinator writes the updated profile after
//! every weight change and `latest_profiles` reads back the newest
//! version per expert. Council selections enforce once-per-(run, week)
//! with a unique constraint backing the in-process guard.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gridiron_core::CouncilSelection;
use gridiron_experts::{CalibrationState, EligibilityGate};
use gridiron_types::{
    ExpertId, LearningEvent, PersonalityProfile, RunId, RunMetadata,
};

use crate::error::DbError;

/// Operations on the `run_metadata`, `experts`, `eligibility_gates`,
/// `calibration`, `learning_events`, and `council_selections` tables.
pub struct RunStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RunStore<'a> {
    /// Create a run store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Run metadata
    // -----------------------------------------------------------------------

    /// Create a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// duplicate run ID).
    pub async fn create_run(&self, metadata: &RunMetadata) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO run_metadata
                  (run_id, season, starting_units, max_parallel_experts,
                   shadow_enabled, reflection_enabled, archetype_naming, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(metadata.run_id.into_inner())
        .bind(i32::from(metadata.season))
        .bind(metadata.starting_units)
        .bind(i64::try_from(metadata.max_parallel_experts).unwrap_or(i64::MAX))
        .bind(metadata.shadow_enabled)
        .bind(metadata.reflection_enabled)
        .bind(&metadata.archetype_naming)
        .bind(metadata.created_at)
        .execute(self.pool)
        .await?;

        tracing::info!(run_id = %metadata.run_id, season = metadata.season, "run created");
        Ok(())
    }

    /// Load a run's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure or a missing row.
    pub async fn get_run(&self, run_id: RunId) -> Result<RunMetadata, DbError> {
        let row = sqlx::query_as::<_, RunRow>(
            r"SELECT run_id, season, starting_units, max_parallel_experts,
                     shadow_enabled, reflection_enabled, archetype_naming, created_at
              FROM run_metadata WHERE run_id = $1",
        )
        .bind(run_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(row.into_metadata())
    }

    // -----------------------------------------------------------------------
    // Expert profiles (versioned snapshots)
    // -----------------------------------------------------------------------

    /// Persist one profile version.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_profile(
        &self,
        run_id: RunId,
        profile: &PersonalityProfile,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO experts (expert_id, run_id, version, name, payload, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (expert_id, run_id, version) DO NOTHING",
        )
        .bind(profile.expert_id.into_inner())
        .bind(run_id.into_inner())
        .bind(i64::from(profile.version))
        .bind(&profile.name)
        .bind(serde_json::to_value(profile)?)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The newest profile version per expert in a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_profiles(&self, run_id: RunId) -> Result<Vec<PersonalityProfile>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT DISTINCT ON (expert_id) payload
              FROM experts
              WHERE run_id = $1
              ORDER BY expert_id, version DESC",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Calibration and eligibility
    // -----------------------------------------------------------------------

    /// Upsert one expert's calibration state for every category.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an upsert fails.
    pub async fn store_calibration(
        &self,
        run_id: RunId,
        expert_id: ExpertId,
        states: &[CalibrationState],
    ) -> Result<(), DbError> {
        for state in states {
            sqlx::query(
                r"INSERT INTO calibration (expert_id, run_id, category, payload, updated_at)
                  VALUES ($1, $2, $3, $4, $5)
                  ON CONFLICT (expert_id, run_id, category)
                  DO UPDATE SET payload = EXCLUDED.payload,
                                updated_at = EXCLUDED.updated_at",
            )
            .bind(expert_id.into_inner())
            .bind(run_id.into_inner())
            .bind(format!("{:?}", state.category).to_lowercase())
            .bind(serde_json::to_value(state)?)
            .bind(Utc::now())
            .execute(self.pool)
            .await?;
        }
        Ok(())
    }

    /// Upsert one expert's eligibility gate.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn store_gate(&self, run_id: RunId, gate: &EligibilityGate) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO eligibility_gates
                  (expert_id, run_id, schema_validity_rate, avg_response_time_ms,
                   eligible, samples, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (expert_id, run_id)
              DO UPDATE SET schema_validity_rate = EXCLUDED.schema_validity_rate,
                            avg_response_time_ms = EXCLUDED.avg_response_time_ms,
                            eligible = EXCLUDED.eligible,
                            samples = EXCLUDED.samples,
                            updated_at = EXCLUDED.updated_at",
        )
        .bind(gate.expert_id.into_inner())
        .bind(run_id.into_inner())
        .bind(gate.schema_validity_rate)
        .bind(gate.avg_response_time_ms)
        .bind(gate.eligible)
        .bind(serde_json::to_value(gate)?)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Load every eligibility gate for a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn gates_for_run(&self, run_id: RunId) -> Result<Vec<EligibilityGate>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT samples FROM eligibility_gates WHERE run_id = $1",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Learning events (durable queue backing)
    // -----------------------------------------------------------------------

    /// Persist a learning event for durable replay.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn store_learning_event(&self, event: &LearningEvent) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO learning_events
                  (event_id, run_id, expert_id, game_id, priority, payload,
                   processed, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)",
        )
        .bind(event.event_id.into_inner())
        .bind(event.run_id.into_inner())
        .bind(event.expert_id.into_inner())
        .bind(event.game_id.into_inner())
        .bind(i16::from(event.priority.level()))
        .bind(serde_json::to_value(event)?)
        .bind(event.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Mark a learning event processed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_event_processed(
        &self,
        event_id: gridiron_types::LearningEventId,
    ) -> Result<(), DbError> {
        sqlx::query(r"UPDATE learning_events SET processed = TRUE WHERE event_id = $1")
            .bind(event_id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// All learning events for a run since a cutoff (the council
    /// selector's evaluation window).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn events_since(
        &self,
        run_id: RunId,
        since: DateTime<Utc>,
    ) -> Result<Vec<LearningEvent>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM learning_events
              WHERE run_id = $1 AND created_at >= $2
              ORDER BY created_at",
        )
        .bind(run_id.into_inner())
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    /// Unprocessed events for a run, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn unprocessed_events(&self, run_id: RunId) -> Result<Vec<LearningEvent>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM learning_events
              WHERE run_id = $1 AND processed = FALSE
              ORDER BY priority DESC, created_at",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Council selections
    // -----------------------------------------------------------------------

    /// Persist a weekly council selection.
    ///
    /// The `(run_id, week)` unique constraint is the durable half of the
    /// once-per-week guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, including on a
    /// duplicate `(run, week)`.
    pub async fn store_selection(&self, selection: &CouncilSelection) -> Result<(), DbError> {
        let members: Vec<Uuid> = selection
            .members
            .iter()
            .map(|id| id.into_inner())
            .collect();
        sqlx::query(
            r"INSERT INTO council_selections (run_id, week, members, selected_at)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(selection.run_id.into_inner())
        .bind(i32::from(selection.week))
        .bind(&members)
        .bind(selection.selected_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Weeks that have already selected for a run (guard restoration).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn completed_selections(&self, run_id: RunId) -> Result<Vec<(RunId, u16)>, DbError> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r"SELECT week FROM council_selections WHERE run_id = $1 ORDER BY week",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(week,)| (run_id, u16::try_from(week).unwrap_or(0)))
            .collect())
    }

    /// The council members selected for a week, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn council_for_week(
        &self,
        run_id: RunId,
        week: u16,
    ) -> Result<Option<Vec<ExpertId>>, DbError> {
        let row: Option<(Vec<Uuid>,)> = sqlx::query_as(
            r"SELECT members FROM council_selections WHERE run_id = $1 AND week = $2",
        )
        .bind(run_id.into_inner())
        .bind(i32::from(week))
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|(members,)| members.into_iter().map(ExpertId::from).collect()))
    }
}

/// A row from the `run_metadata` table.
#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    run_id: Uuid,
    season: i32,
    starting_units: rust_decimal::Decimal,
    max_parallel_experts: i64,
    shadow_enabled: bool,
    reflection_enabled: bool,
    archetype_naming: String,
    created_at: DateTime<Utc>,
}

impl RunRow {
    fn into_metadata(self) -> RunMetadata {
        RunMetadata {
            run_id: RunId::from(self.run_id),
            season: u16::try_from(self.season).unwrap_or(0),
            starting_units: self.starting_units,
            max_parallel_experts: usize::try_from(self.max_parallel_experts).unwrap_or(8),
            shadow_enabled: self.shadow_enabled,
            reflection_enabled: self.reflection_enabled,
            archetype_naming: self.archetype_naming,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn run_row_round_trips() {
        let row = RunRow {
            run_id: Uuid::now_v7(),
            season: 2025,
            starting_units: Decimal::new(100, 0),
            max_parallel_experts: 8,
            shadow_enabled: false,
            reflection_enabled: true,
            archetype_naming: String::from("table-v1"),
            created_at: Utc::now(),
        };
        let metadata = row.into_metadata();
        assert_eq!(metadata.season, 2025);
        assert_eq!(metadata.max_parallel_experts, 8);
        assert_eq!(metadata.archetype_naming, "table-v1");
    }
}
