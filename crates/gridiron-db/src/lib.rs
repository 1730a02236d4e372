//! Data layer (`PostgreSQL` + `Dragonfly`) for the Gridiron Council
//! platform.
//!
//! `PostgreSQL` is the durable store: predictions, reasoning chains,
//! memories (with the pgvector HNSW index), belief revisions, bankrolls,
//! bets, refusals, calibration, eligibility, learning events, and run
//! metadata. `Dragonfly` is the hot cache for assembled UDV snapshots
//! with per-section TTLs.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, migrations, and the schema guard
//! - [`dragonfly`] -- the UDV hot cache
//! - [`memory_store`] -- append-only memories and vector retrieval
//! - [`prediction_store`] -- bundles, chains, UDV snapshots
//! - [`bet_store`] -- transactional placement and settlement
//! - [`revision_store`] -- immutable belief revisions
//! - [`run_store`] -- runs, profiles, events, council selections
//!
//! Run isolation: every mutation table carries `run_id` and every query
//! here filters by it.

pub mod bet_store;
pub mod dragonfly;
pub mod error;
pub mod memory_store;
pub mod postgres;
pub mod prediction_store;
pub mod revision_store;
pub mod run_store;

// Re-export primary types at crate root.
pub use bet_store::{BetStore, CategoryWinRow};
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use memory_store::MemoryStore;
pub use postgres::PostgresPool;
pub use prediction_store::{PredictionCountRow, PredictionStore};
pub use revision_store::RevisionStore;
pub use run_store::RunStore;
