//! Bet, bankroll, and refusal persistence.
//!
//! Two operations here are transactional by contract:
//!
//! - **Placement** writes the bet row and the escrow-debited bankroll in
//!   one transaction: either both land or neither does.
//! - **Settlement** writes every settled bet and every updated bankroll
//!   for a game in one transaction, so a partial failure rolls the whole
//!   game back for re-queue.
//!
//! Refusal logs complete the confidence-to-bet coupling: for every
//! confident call there is either a bet row or a refusal row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use gridiron_core::GameSettlement;
use gridiron_bank::RefusalLog;
use gridiron_types::{Bankroll, BetStatus, ExpertId, GameId, RunId, VirtualBet};

use crate::error::DbError;

/// Operations on the `virtual_bets`, `bankrolls`, and `bet_refusals`
/// tables.
pub struct BetStore<'a> {
    pool: &'a PgPool,
}

impl<'a> BetStore<'a> {
    /// Create a bet store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Bankroll lifecycle
    // -----------------------------------------------------------------------

    /// Seed a fresh bankroll row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn seed_bankroll(&self, bankroll: &Bankroll) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO bankrolls
                  (expert_id, run_id, starting_units, current_units, peak_units,
                   pending_stakes, total_staked, total_profit, total_bets,
                   winning_bets, roi, active, eliminated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
              ON CONFLICT (expert_id, run_id) DO NOTHING",
        )
        .bind(bankroll.expert_id.into_inner())
        .bind(bankroll.run_id.into_inner())
        .bind(bankroll.starting_units)
        .bind(bankroll.current_units)
        .bind(bankroll.peak_units)
        .bind(bankroll.pending_stakes)
        .bind(bankroll.total_staked)
        .bind(bankroll.total_profit)
        .bind(i64::from(bankroll.total_bets))
        .bind(i64::from(bankroll.winning_bets))
        .bind(bankroll.roi)
        .bind(bankroll.active)
        .bind(bankroll.eliminated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Load one expert's bankroll for a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure or a missing row.
    pub async fn get_bankroll(
        &self,
        expert_id: ExpertId,
        run_id: RunId,
    ) -> Result<Bankroll, DbError> {
        let row = sqlx::query_as::<_, BankrollRow>(
            r"SELECT expert_id, run_id, starting_units, current_units, peak_units,
                     pending_stakes, total_staked, total_profit, total_bets,
                     winning_bets, roi, active, eliminated_at
              FROM bankrolls
              WHERE expert_id = $1 AND run_id = $2",
        )
        .bind(expert_id.into_inner())
        .bind(run_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(row.into_bankroll())
    }

    /// All bankrolls for a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn bankrolls_for_run(&self, run_id: RunId) -> Result<Vec<Bankroll>, DbError> {
        let rows = sqlx::query_as::<_, BankrollRow>(
            r"SELECT expert_id, run_id, starting_units, current_units, peak_units,
                     pending_stakes, total_staked, total_profit, total_bets,
                     winning_bets, roi, active, eliminated_at
              FROM bankrolls
              WHERE run_id = $1
              ORDER BY current_units DESC",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(BankrollRow::into_bankroll).collect())
    }

    // -----------------------------------------------------------------------
    // Placement (transactional)
    // -----------------------------------------------------------------------

    /// Persist a placed bet and its escrow-debited bankroll atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on any failure; the transaction
    /// rolls back and neither row changes.
    pub async fn persist_placement(
        &self,
        bet: &VirtualBet,
        bankroll: &Bankroll,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        insert_bet(&mut tx, bet).await?;
        update_bankroll(&mut tx, bankroll).await?;

        tx.commit().await?;
        tracing::debug!(bet_id = %bet.bet_id, stake = %bet.stake, "placement persisted");
        Ok(())
    }

    /// Log a refusal so the coupling contract is auditable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn log_refusal(&self, refusal: &RefusalLog) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO bet_refusals
                  (run_id, expert_id, game_id, category, confidence, reason,
                   detail, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(refusal.run_id.into_inner())
        .bind(refusal.expert_id.into_inner())
        .bind(refusal.game_id.into_inner())
        .bind(enum_db_str(&refusal.category)?)
        .bind(refusal.confidence)
        .bind(enum_db_str(&refusal.refusal.reason)?)
        .bind(&refusal.refusal.detail)
        .bind(refusal.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settlement (transactional)
    // -----------------------------------------------------------------------

    /// Pending bets for a game in a run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn pending_bets(
        &self,
        run_id: RunId,
        game_id: GameId,
    ) -> Result<Vec<VirtualBet>, DbError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT payload FROM virtual_bets
              WHERE run_id = $1 AND game_id = $2 AND status = 'pending'
              ORDER BY placed_at",
        )
        .bind(run_id.into_inner())
        .bind(game_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter()
            .map(|(payload,)| Ok(serde_json::from_value(payload)?))
            .collect()
    }

    /// Persist a whole game's settlement atomically.
    ///
    /// Every settled bet and every touched bankroll commits together or
    /// not at all; a partial failure rolls back for re-queue.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on any failure (full rollback).
    pub async fn persist_settlement(&self, settlement: &GameSettlement) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for bet in &settlement.settled_bets {
            update_bet(&mut tx, bet).await?;
        }
        for bankroll in settlement.bankrolls.values() {
            update_bankroll(&mut tx, bankroll).await?;
        }

        tx.commit().await?;
        tracing::info!(
            bets = settlement.settled_bets.len(),
            bankrolls = settlement.bankrolls.len(),
            "game settlement persisted"
        );
        Ok(())
    }

    /// Per-expert, per-category win counts over settled bets (the
    /// council selector's specialization input).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn category_win_counts(
        &self,
        run_id: RunId,
    ) -> Result<Vec<CategoryWinRow>, DbError> {
        let rows = sqlx::query_as::<_, CategoryWinRow>(
            r"SELECT expert_id,
                     payload->>'category' AS category,
                     COUNT(*) FILTER (WHERE status = 'won') AS wins,
                     COUNT(*) FILTER (WHERE status IN ('won', 'lost')) AS decided
              FROM virtual_bets
              WHERE run_id = $1 AND status <> 'pending'
              GROUP BY expert_id, payload->>'category'",
        )
        .bind(run_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Realized returns for one expert in settlement order, for the
    /// volatility and drawdown statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn settled_returns(
        &self,
        run_id: RunId,
        expert_id: ExpertId,
    ) -> Result<Vec<Decimal>, DbError> {
        let rows: Vec<(Decimal,)> = sqlx::query_as(
            r"SELECT realized_payout FROM virtual_bets
              WHERE run_id = $1 AND expert_id = $2 AND status <> 'pending'
              ORDER BY settled_at",
        )
        .bind(run_id.into_inner())
        .bind(expert_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(r,)| r).collect())
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

async fn insert_bet(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    bet: &VirtualBet,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO virtual_bets
              (bet_id, run_id, expert_id, game_id, status, stake,
               realized_payout, payload, placed_at, settled_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(bet.bet_id.into_inner())
    .bind(bet.run_id.into_inner())
    .bind(bet.expert_id.into_inner())
    .bind(bet.game_id.into_inner())
    .bind(status_str(bet.status))
    .bind(bet.stake)
    .bind(bet.realized_payout)
    .bind(serde_json::to_value(bet)?)
    .bind(bet.placed_at)
    .bind(bet.settled_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_bet(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    bet: &VirtualBet,
) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE virtual_bets
          SET status = $2, realized_payout = $3, payload = $4, settled_at = $5
          WHERE bet_id = $1",
    )
    .bind(bet.bet_id.into_inner())
    .bind(status_str(bet.status))
    .bind(bet.realized_payout)
    .bind(serde_json::to_value(bet)?)
    .bind(bet.settled_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_bankroll(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    bankroll: &Bankroll,
) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE bankrolls
          SET current_units = $3, peak_units = $4, pending_stakes = $5,
              total_staked = $6, total_profit = $7, total_bets = $8,
              winning_bets = $9, roi = $10, active = $11, eliminated_at = $12
          WHERE expert_id = $1 AND run_id = $2",
    )
    .bind(bankroll.expert_id.into_inner())
    .bind(bankroll.run_id.into_inner())
    .bind(bankroll.current_units)
    .bind(bankroll.peak_units)
    .bind(bankroll.pending_stakes)
    .bind(bankroll.total_staked)
    .bind(bankroll.total_profit)
    .bind(i64::from(bankroll.total_bets))
    .bind(i64::from(bankroll.winning_bets))
    .bind(bankroll.roi)
    .bind(bankroll.active)
    .bind(bankroll.eliminated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Per-category win counts for one expert.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryWinRow {
    /// The expert.
    pub expert_id: Uuid,
    /// Category string from the bet payload.
    pub category: Option<String>,
    /// Settled wins.
    pub wins: i64,
    /// Settled wins plus losses (pushes excluded).
    pub decided: i64,
}

/// A row from the `bankrolls` table.
#[derive(Debug, sqlx::FromRow)]
struct BankrollRow {
    expert_id: Uuid,
    run_id: Uuid,
    starting_units: Decimal,
    current_units: Decimal,
    peak_units: Decimal,
    pending_stakes: Decimal,
    total_staked: Decimal,
    total_profit: Decimal,
    total_bets: i64,
    winning_bets: i64,
    roi: Decimal,
    active: bool,
    eliminated_at: Option<DateTime<Utc>>,
}

impl BankrollRow {
    fn into_bankroll(self) -> Bankroll {
        Bankroll {
            expert_id: ExpertId::from(self.expert_id),
            run_id: RunId::from(self.run_id),
            starting_units: self.starting_units,
            current_units: self.current_units,
            peak_units: self.peak_units,
            pending_stakes: self.pending_stakes,
            total_staked: self.total_staked,
            total_profit: self.total_profit,
            total_bets: u32::try_from(self.total_bets).unwrap_or(0),
            winning_bets: u32::try_from(self.winning_bets).unwrap_or(0),
            roi: self.roi,
            active: self.active,
            eliminated_at: self.eliminated_at,
        }
    }
}

/// Serialize an enum to its snake_case database string.
fn enum_db_str<T: serde::Serialize>(value: &T) -> Result<String, DbError> {
    let json = serde_json::to_value(value)?;
    json.as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| DbError::RowConversion(String::from("enum did not serialize to a string")))
}

/// The database string for a bet status.
const fn status_str(status: BetStatus) -> &'static str {
    match status {
        BetStatus::Pending => "pending",
        BetStatus::Won => "won",
        BetStatus::Lost => "lost",
        BetStatus::Push => "push",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_schema() {
        assert_eq!(status_str(BetStatus::Pending), "pending");
        assert_eq!(status_str(BetStatus::Won), "won");
        assert_eq!(status_str(BetStatus::Lost), "lost");
        assert_eq!(status_str(BetStatus::Push), "push");
    }

    #[test]
    fn bankroll_row_round_trips() {
        let row = BankrollRow {
            expert_id: Uuid::now_v7(),
            run_id: Uuid::now_v7(),
            starting_units: Decimal::new(100, 0),
            current_units: Decimal::new(85, 0),
            peak_units: Decimal::new(120, 0),
            pending_stakes: Decimal::new(15, 0),
            total_staked: Decimal::new(200, 0),
            total_profit: Decimal::new(-15, 0),
            total_bets: 12,
            winning_bets: 5,
            roi: Decimal::new(-75, 3),
            active: true,
            eliminated_at: None,
        };
        let bankroll = row.into_bankroll();
        assert_eq!(bankroll.total_bets, 12);
        assert_eq!(bankroll.current_units, Decimal::new(85, 0));
        assert!(bankroll.active);
    }
}
