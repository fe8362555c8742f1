//! Daily duplication of cards on recurring boards.
//!
//! Every open card that was due before today (or has no due date) is copied
//! into its own list with a due date of today 00:00 UTC. A copy due today
//! with the same title in the same list marks the card as already handled,
//! so running the job twice on one day duplicates nothing.
//!
//! Runs are serialized through a Postgres advisory lock, which covers the
//! scheduler, the HTTP trigger and the CLI alike. A run that finds the lock
//! taken fails with a conflict instead of waiting.

use chrono::{DateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use sqlx::{Connection, PgPool};
use std::sync::RwLock;
use uuid::Uuid;

use super::card_service::{append_to_list, duplicate};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Board, Card};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecurringReport {
    pub boards: usize,
    pub duplicated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub report: RecurringReport,
}

static LAST_RUN: Lazy<RwLock<Option<LastRun>>> = Lazy::new(|| RwLock::new(None));

/// Outcome of the most recent run in this process
pub fn last_run() -> Option<LastRun> {
    LAST_RUN.read().ok().and_then(|guard| guard.clone())
}

fn record(report: &RecurringReport) {
    if let Ok(mut guard) = LAST_RUN.write() {
        *guard = Some(LastRun {
            finished_at: Utc::now(),
            report: report.clone(),
        });
    }
}

/// Advisory lock key held for the duration of a run
const RUN_LOCK_KEY: i64 = 0x6b61_6e62_616e_7263;

/// Midnight UTC of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub struct RecurringService {
    pool: PgPool,
}

impl RecurringService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn run(&self) -> Result<RecurringReport, ApiError> {
        // Session lock on a connection that never returns to the pool
        let mut conn = self.pool.acquire().await?.detach();
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut conn)
            .await?;
        if !locked {
            tracing::warn!("Recurring run skipped, another run holds the lock");
            return Err(ApiError::conflict("A recurring run is already in progress"));
        }

        let result = self.run_locked().await;

        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(RUN_LOCK_KEY)
            .execute(&mut conn)
            .await
        {
            tracing::warn!("Failed to release recurring run lock: {}", e);
        }
        if let Err(e) = conn.close().await {
            tracing::debug!("Recurring lock connection close failed: {}", e);
        }

        result
    }

    async fn run_locked(&self) -> Result<RecurringReport, ApiError> {
        let today = start_of_day(Utc::now());
        let boards = sqlx::query_as::<_, Board>(
            r#"
            SELECT * FROM boards
            WHERE deleted_at IS NULL AND recurring_config->>'isRecurring' = 'true'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut report = RecurringReport {
            boards: boards.len(),
            ..RecurringReport::default()
        };
        tracing::info!("Recurring run for {} found {} boards", today.date_naive(), boards.len());

        for board in &boards {
            match self.run_board(board, today).await {
                Ok((duplicated, failed)) => {
                    report.duplicated += duplicated;
                    report.failed += failed;
                }
                Err(e) => {
                    tracing::error!("Recurring run failed for board {}: {}", board.id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Recurring run finished: {} boards, {} cards duplicated, {} failures",
            report.boards,
            report.duplicated,
            report.failed
        );
        record(&report);
        Ok(report)
    }

    /// `(duplicated, failed)` for one board
    async fn run_board(&self, board: &Board, today: DateTime<Utc>) -> Result<(usize, usize), ApiError> {
        let (_, completed_list_id) = board.recurring();

        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT c.* FROM cards c
            JOIN lists l ON l.id = c.list_id
            WHERE c.board_id = $1
              AND c.deleted_at IS NULL AND c.archived = FALSE
              AND l.deleted_at IS NULL
              AND ($2::uuid IS NULL OR c.list_id <> $2)
              AND (c.due_date IS NULL OR c.due_date < $3)
              AND NOT EXISTS (
                  SELECT 1 FROM cards d
                  WHERE d.list_id = c.list_id AND d.title = c.title
                    AND d.due_date = $3 AND d.deleted_at IS NULL
              )
            ORDER BY c.position ASC, c.created_at ASC
            "#,
        )
        .bind(board.id)
        .bind(completed_list_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        let mut duplicated = 0;
        let mut failed = 0;
        for card in &cards {
            match self.duplicate_card(board, card, today).await {
                Ok(copy_id) => {
                    tracing::debug!("Recurring card {} duplicated as {}", card.id, copy_id);
                    duplicated += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to duplicate recurring card {}: {}", card.id, e);
                    failed += 1;
                }
            }
        }
        Ok((duplicated, failed))
    }

    async fn duplicate_card(&self, board: &Board, card: &Card, today: DateTime<Utc>) -> Result<Uuid, ApiError> {
        let actor = card.created_by.unwrap_or(board.owner_id);

        let mut tx = self.pool.begin().await?;
        let copy = duplicate(&mut tx, card, card.list_id, &card.title, Some(today), actor).await?;
        append_to_list(&mut tx, card.list_id, copy.id).await?;
        tx.commit().await?;

        Ok(copy.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_starts_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 17, 45, 12).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn report_serializes_flat() {
        let report = RecurringReport { boards: 2, duplicated: 5, failed: 1 };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"boards": 2, "duplicated": 5, "failed": 1})
        );
    }
}
