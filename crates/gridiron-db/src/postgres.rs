//! The `PostgreSQL` connection pool and schema guard.
//!
//! One pool serves every store in the platform. Beyond connecting, this
//! module owns two operational concerns specific to this schema:
//!
//! - **Migrations** from `migrations/` run at engine startup, before any
//!   command touches a table.
//! - **[`verify_schema`](PostgresPool::verify_schema)** confirms that
//!   every table the platform writes to actually exists and that the
//!   `vector` extension backing memory retrieval is installed. A half-
//!   migrated database fails loudly here instead of surfacing later as a
//!   mid-settlement query error.
//!
//! Queries throughout the data layer are runtime-constructed and
//! parameterized; nothing requires a live database at build time.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::DbError;

/// Connections held by the pool. Sized for one engine process driving a
/// fifteen-expert round plus the learning drain.
const POOL_SIZE: u32 = 12;

/// How long a command waits for a free connection before giving up.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are recycled after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(240);

/// Every table the platform mutates. `verify_schema` checks each one.
const REQUIRED_TABLES: [&str; 14] = [
    "run_metadata",
    "experts",
    "universal_game_data_snapshots",
    "predictions",
    "reasoning_chains",
    "memories",
    "belief_revisions",
    "bankrolls",
    "virtual_bets",
    "bet_refusals",
    "calibration",
    "eligibility_gates",
    "learning_events",
    "council_selections",
];

/// Shared handle to the platform's `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Open the pool against a `postgresql://` URL.
    ///
    /// The connection is tagged with an application name so operators
    /// can tell engine sessions apart in `pg_stat_activity`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] for an unparseable URL and
    /// [`DbError::Postgres`] when the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("bad postgres URL: {e}")))?;
        let options = options.application_name("gridiron-engine");

        let pool = PgPoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await?;

        tracing::info!(pool_size = POOL_SIZE, "postgres pool ready");
        Ok(Self { pool })
    }

    /// Apply any pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("migrations applied");
        Ok(())
    }

    /// Guard the schema: every required table present, `vector`
    /// extension installed.
    ///
    /// Run after migrations at startup. The memory store's HNSW
    /// retrieval silently degrades to sequential scans without the
    /// extension, so its absence is an error, not a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] naming everything that is missing.
    pub async fn verify_schema(&self) -> Result<(), DbError> {
        let tables: Vec<(String,)> = sqlx::query_as(
            r"SELECT tablename FROM pg_tables WHERE schemaname = 'public'",
        )
        .fetch_all(&self.pool)
        .await?;

        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .filter(|required| !tables.iter().any(|(name,)| name == *required))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(DbError::Config(format!(
                "schema incomplete, missing tables: {}",
                missing.join(", ")
            )));
        }

        let vector_ext: Option<(String,)> = sqlx::query_as(
            r"SELECT extname FROM pg_extension WHERE extname = 'vector'",
        )
        .fetch_optional(&self.pool)
        .await?;
        if vector_ext.is_none() {
            return Err(DbError::Config(String::from(
                "pgvector extension not installed; memory retrieval requires it",
            )));
        }

        tracing::debug!(tables = REQUIRED_TABLES.len(), "schema verified");
        Ok(())
    }

    /// The underlying [`PgPool`] the stores bind to.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drain and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("postgres pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_tables_cover_the_spec_surface() {
        // The twelve logical tables from the persistence contract, plus
        // the refusal log and council selections.
        for table in [
            "experts",
            "universal_game_data_snapshots",
            "predictions",
            "reasoning_chains",
            "memories",
            "belief_revisions",
            "bankrolls",
            "virtual_bets",
            "calibration",
            "eligibility_gates",
            "learning_events",
            "run_metadata",
        ] {
            assert!(REQUIRED_TABLES.contains(&table));
        }
    }

    #[test]
    fn required_tables_are_unique() {
        let mut tables = REQUIRED_TABLES.to_vec();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), REQUIRED_TABLES.len());
    }
}
