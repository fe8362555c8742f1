use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::access::{self, BoardContext};
use super::validation;
use crate::database::manager::DatabaseManager;
use crate::database::models::List;
use crate::database::patch::UpdateBuilder;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::ordering;

const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateList {
    pub board_id: Uuid,
    pub title: String,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateList {
    pub title: Option<String>,
    pub color: Option<String>,
    pub card_order_ids: Option<Vec<Uuid>>,
}

pub struct ListService {
    pool: PgPool,
}

impl ListService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    async fn load(&self, list_id: Uuid) -> Result<List, ApiError> {
        sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = $1 AND deleted_at IS NULL")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("List not found"))
    }

    /// Load a list together with the caller's access to its board
    async fn load_with_context(&self, user: &CurrentUser, list_id: Uuid) -> Result<(List, BoardContext), ApiError> {
        let list = self.load(list_id).await?;
        let ctx = access::load_board(&self.pool, user, list.board_id).await?;
        Ok((list, ctx))
    }

    pub async fn create(&self, user: &CurrentUser, input: CreateList) -> Result<List, ApiError> {
        let title = validation::title("title", &input.title, 3, 255)?;
        let ctx = access::load_board(&self.pool, user, input.board_id).await?;
        ctx.require_edit()?;

        let mut tx = self.pool.begin().await?;

        let list = sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (id, board_id, title, color, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.board_id)
        .bind(&title)
        .bind(input.color.as_deref().unwrap_or(DEFAULT_COLOR))
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE boards SET list_order_ids = list_order_ids || jsonb_build_array($2::text), last_activity = NOW() WHERE id = $1",
        )
        .bind(input.board_id)
        .bind(list.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("List {} '{}' created on board {}", list.id, list.title, list.board_id);
        Ok(list)
    }

    /// Live lists of a board in the board's stored order
    pub async fn by_board(&self, user: &CurrentUser, board_id: Uuid, include_archived: bool) -> Result<Vec<List>, ApiError> {
        let ctx = access::load_board(&self.pool, user, board_id).await?;

        let lists = sqlx::query_as::<_, List>(
            r#"
            SELECT * FROM lists
            WHERE board_id = $1 AND deleted_at IS NULL AND ($2 OR archived = FALSE)
            ORDER BY created_at ASC
            "#,
        )
        .bind(board_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(ordering::reconcile(&ctx.board.list_order_ids.0, lists, |l| l.id))
    }

    pub async fn get(&self, user: &CurrentUser, list_id: Uuid) -> Result<List, ApiError> {
        let (list, _) = self.load_with_context(user, list_id).await?;
        Ok(list)
    }

    pub async fn update(&self, user: &CurrentUser, list_id: Uuid, input: UpdateList) -> Result<List, ApiError> {
        let (list, ctx) = self.load_with_context(user, list_id).await?;
        ctx.require_edit()?;

        let title = validation::optional_title("title", input.title, 3, 255)?;
        let card_order = input.card_order_ids.map(|ids| json!(ordering::dedup(&ids)));

        let mut update = UpdateBuilder::new("lists");
        update
            .set("title", title)
            .set("color", input.color)
            .set("card_order_ids", card_order)
            .set_always("updated_by", user.id);

        let updated = update
            .finish(list.id)
            .build_query_as::<List>()
            .fetch_one(&self.pool)
            .await?;

        access::touch_board(&self.pool, list.board_id).await?;
        Ok(updated)
    }

    pub async fn reorder_cards(&self, user: &CurrentUser, list_id: Uuid, card_order_ids: Vec<Uuid>) -> Result<List, ApiError> {
        self.update(
            user,
            list_id,
            UpdateList {
                card_order_ids: Some(card_order_ids),
                ..UpdateList::default()
            },
        )
        .await
    }

    pub async fn set_archived(&self, user: &CurrentUser, list_id: Uuid, archived: bool) -> Result<List, ApiError> {
        let (list, ctx) = self.load_with_context(user, list_id).await?;
        ctx.require_edit()?;

        let mut update = UpdateBuilder::new("lists");
        update
            .set_always("archived", archived)
            .set_always("updated_by", user.id);
        let updated = update
            .finish(list.id)
            .build_query_as::<List>()
            .fetch_one(&self.pool)
            .await?;

        access::touch_board(&self.pool, list.board_id).await?;
        tracing::info!("List {} archived={} by {}", list_id, archived, user.id);
        Ok(updated)
    }

    /// Soft delete that also drops the list from its board's order
    pub async fn delete(&self, user: &CurrentUser, list_id: Uuid) -> Result<(), ApiError> {
        let (list, ctx) = self.load_with_context(user, list_id).await?;
        ctx.require_edit()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE lists SET deleted_at = NOW(), deleted_by = $2 WHERE id = $1")
            .bind(list.id)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE boards SET list_order_ids = list_order_ids - $2::text, last_activity = NOW() WHERE id = $1",
        )
        .bind(list.board_id)
        .bind(list.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("List {} deleted by {}", list_id, user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_accepts_card_order() {
        let id = Uuid::new_v4();
        let input: UpdateList = serde_json::from_value(json!({"cardOrderIds": [id, id]})).unwrap();
        let order = ordering::dedup(&input.card_order_ids.unwrap());
        assert_eq!(order, vec![id]);
        assert!(input.title.is_none());
    }
}
