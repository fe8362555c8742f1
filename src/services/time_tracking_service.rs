use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::card_service::readable_card;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Card, TimeTrackingEntry};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::tracking::{self, TrackingAction, TrackingState, TrackingSummary};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub card_id: Uuid,
    pub action: String,
    pub note: Option<String>,
}

pub struct TimeTrackingService {
    pool: PgPool,
}

impl TimeTrackingService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Apply a tracking action to a card and journal it
    pub async fn track(&self, user: &CurrentUser, request: TrackRequest) -> Result<TimeTrackingEntry, ApiError> {
        let action: TrackingAction = request
            .action
            .parse()
            .map_err(|_| ApiError::invalid_field("action", "Action must be one of: start, pause, resume, stop"))?;

        let (card, ctx) = readable_card(&self.pool, user, request.card_id).await?;
        ctx.require_edit()?;

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 FOR UPDATE")
            .bind(card.id)
            .fetch_one(&mut *tx)
            .await?;

        let now = Utc::now();
        let transition = tracking::apply(&TrackingState::from(&locked), action, now)?;

        sqlx::query(
            r#"
            UPDATE cards
            SET total_time_spent = $2, is_tracking = $3, tracking_start_time = $4,
                tracking_pause_time = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(card.id)
        .bind(transition.state.total_time_spent)
        .bind(transition.state.is_tracking)
        .bind(transition.state.tracking_start_time)
        .bind(transition.state.tracking_pause_time)
        .execute(&mut *tx)
        .await?;

        let entry = sqlx::query_as::<_, TimeTrackingEntry>(
            r#"
            INSERT INTO card_time_tracking (id, card_id, user_id, action, start_time, end_time, duration, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(card.id)
        .bind(user.id)
        .bind(action.as_str())
        .bind(transition.entry_start_time)
        .bind(transition.entry_end_time)
        .bind(transition.duration)
        .bind(&request.note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Tracking {} on card {} by {} ({}s, total {}s)",
            action,
            card.id,
            user.id,
            transition.duration,
            transition.state.total_time_spent
        );
        Ok(entry)
    }

    /// Journal entries, newest first
    pub async fn history(&self, user: &CurrentUser, card_id: Uuid) -> Result<Vec<TimeTrackingEntry>, ApiError> {
        let (card, _) = readable_card(&self.pool, user, card_id).await?;
        let entries = sqlx::query_as::<_, TimeTrackingEntry>(
            r#"
            SELECT t.*, u.name AS user_name
            FROM card_time_tracking t
            LEFT JOIN users u ON u.id = t.user_id
            WHERE t.card_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(card.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn summary(&self, user: &CurrentUser, card_id: Uuid) -> Result<TrackingSummary, ApiError> {
        let (card, _) = readable_card(&self.pool, user, card_id).await?;
        Ok(tracking::summary(&TrackingState::from(&card), Utc::now()))
    }

    /// Zero the card's totals and stop any running session. The journal is kept.
    pub async fn reset(&self, user: &CurrentUser, card_id: Uuid) -> Result<TrackingSummary, ApiError> {
        let (card, ctx) = readable_card(&self.pool, user, card_id).await?;
        ctx.require_edit()?;

        let idle = TrackingState::idle();
        sqlx::query(
            r#"
            UPDATE cards
            SET total_time_spent = $2, is_tracking = $3, tracking_start_time = $4,
                tracking_pause_time = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(card.id)
        .bind(idle.total_time_spent)
        .bind(idle.is_tracking)
        .bind(idle.tracking_start_time)
        .bind(idle.tracking_pause_time)
        .execute(&self.pool)
        .await?;

        tracing::info!("Tracking reset on card {} by {}", card.id, user.id);
        Ok(tracking::summary(&idle, Utc::now()))
    }
}
