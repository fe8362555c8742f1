use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{types::Json, PgPool, QueryBuilder};
use uuid::Uuid;

use super::access::{self, BoardContext};
use super::validation;
use crate::board_view::{self, AssignedBoard, BoardDetail, BoardRows, BoardViewOptions};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Board, BoardSummary, Card, CardMemberRow, CardWithBoard, Label, List, MemberView};
use crate::database::patch::{deserialize_some, UpdateBuilder};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::ordering;
use crate::types::MemberRole;
use crate::visibility::OwnerScope;

pub(crate) const MEMBER_COLUMNS: &str =
    "m.member_id, m.role, m.joined_at, u.name, u.email, u.avatar, u.user_type";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoard {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBoard {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub icon: Option<Option<String>>,
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub company_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub department_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringConfigInput {
    pub is_recurring: bool,
    pub completed_list_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMember {
    pub member_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabel {
    pub title: String,
    pub color: Option<String>,
}

pub struct BoardService {
    pool: PgPool,
}

impl BoardService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn context(&self, user: &CurrentUser, board_id: Uuid) -> Result<BoardContext, ApiError> {
        access::load_board(&self.pool, user, board_id).await
    }

    /// Boards the user owns, belongs to, or sees through their organizational scope,
    /// in the user's saved order.
    pub async fn list(&self, user: &CurrentUser) -> Result<Vec<BoardSummary>, ApiError> {
        let mut query = QueryBuilder::new(
            r#"
            SELECT b.id, b.title, b.description, b.icon, b.owner_id,
                   u.name AS owner_name, u.email AS owner_email, u.user_type AS owner_type,
                   b.is_public,
                   (SELECT COUNT(*) FROM board_members bm WHERE bm.board_id = b.id) AS member_count,
                   b.recurring_config, b.last_activity, b.created_at
            FROM boards b
            JOIN users u ON u.id = b.owner_id
            WHERE b.deleted_at IS NULL AND (b.owner_id = "#,
        );
        query
            .push_bind(user.id)
            .push(" OR EXISTS (SELECT 1 FROM board_members mm WHERE mm.board_id = b.id AND mm.member_id = ")
            .push_bind(user.id)
            .push(") OR ");
        OwnerScope::for_viewer(&user.viewer()).push_predicate(&mut query, "b.owner_id");
        query.push(") ORDER BY b.created_at ASC");

        let boards = query.build_query_as::<BoardSummary>().fetch_all(&self.pool).await?;
        let order = self.board_order(user.id).await?;

        Ok(ordering::reconcile(&order, boards, |b| b.id))
    }

    async fn board_order(&self, user_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let row: Option<(Json<Vec<Uuid>>,)> =
            sqlx::query_as("SELECT board_order_ids FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(order,)| order.0).unwrap_or_default())
    }

    pub async fn create(&self, user: &CurrentUser, input: CreateBoard) -> Result<Board, ApiError> {
        let title = validation::title("title", &input.title, 1, 255)?;

        let mut tx = self.pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (id, title, description, icon, owner_id, company_id, department_id,
                                is_public, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&title)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(user.id)
        .bind(input.company_id.or(user.company_id))
        .bind(input.department_id.or(user.department_id))
        .bind(input.is_public)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO board_members (board_id, member_id, role) VALUES ($1, $2, $3)")
            .bind(board.id)
            .bind(user.id)
            .bind(MemberRole::Owner.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Board {} '{}' created by {}", board.id, board.title, user.id);
        Ok(board)
    }

    pub async fn detail(
        &self,
        user: &CurrentUser,
        board_id: Uuid,
        options: BoardViewOptions,
    ) -> Result<BoardDetail, ApiError> {
        let BoardContext { board, access } = self.context(user, board_id).await?;

        let lists = sqlx::query_as::<_, List>(
            "SELECT * FROM lists WHERE board_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool);
        let cards = sqlx::query_as::<_, Card>(
            "SELECT * FROM cards WHERE board_id = $1 AND deleted_at IS NULL ORDER BY position ASC, created_at ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool);
        let card_members_sql = format!(
            r#"
            SELECT m.card_id, {}
            FROM card_members m
            JOIN cards c ON c.id = m.card_id
            JOIN users u ON u.id = m.member_id
            WHERE c.board_id = $1 AND c.deleted_at IS NULL AND u.deleted_at IS NULL
            ORDER BY m.joined_at ASC
            "#,
            MEMBER_COLUMNS
        );
        let card_members = sqlx::query_as::<_, CardMemberRow>(&card_members_sql)
            .bind(board_id)
            .fetch_all(&self.pool);
        let labels = sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE board_id = $1 ORDER BY created_at ASC")
            .bind(board_id)
            .fetch_all(&self.pool);
        let members_sql = board_members_sql();
        let members = sqlx::query_as::<_, MemberView>(&members_sql)
            .bind(board_id)
            .fetch_all(&self.pool);

        let (lists, cards, card_members, labels, members) =
            futures::try_join!(lists, cards, card_members, labels, members)?;

        let rows = BoardRows { board, lists, cards, card_members, labels, members };
        Ok(board_view::assemble_board(user.id, rows, access, options))
    }

    /// Cards other users put this user on, gathered across every board
    pub async fn assigned(&self, user: &CurrentUser) -> Result<AssignedBoard, ApiError> {
        let cards = sqlx::query_as::<_, CardWithBoard>(
            r#"
            SELECT c.*, b.title AS board_title, l.title AS list_title, b.recurring_config
            FROM cards c
            JOIN card_members cm ON cm.card_id = c.id
            JOIN boards b ON b.id = c.board_id
            JOIN lists l ON l.id = c.list_id
            WHERE cm.member_id = $1
              AND c.deleted_at IS NULL AND c.archived = FALSE
              AND b.deleted_at IS NULL
              AND l.deleted_at IS NULL
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        let card_ids: Vec<Uuid> = cards.iter().map(|c| c.card.id).collect();
        let members = card_members(&self.pool, &card_ids).await?;

        let order: Option<(Json<Vec<Uuid>>,)> =
            sqlx::query_as("SELECT card_order_ids FROM users WHERE id = $1")
                .bind(user.id)
                .fetch_optional(&self.pool)
                .await?;
        let order = order.map(|(o,)| o.0).unwrap_or_default();

        Ok(board_view::assemble_assigned(user.id, cards, members, &order))
    }

    pub async fn update(&self, user: &CurrentUser, board_id: Uuid, input: UpdateBoard) -> Result<Board, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        let title = validation::optional_title("title", input.title, 1, 255)?;

        let mut update = UpdateBuilder::new("boards");
        update
            .set("title", title)
            .set("description", input.description)
            .set("icon", input.icon)
            .set("is_public", input.is_public)
            .set("company_id", input.company_id)
            .set("department_id", input.department_id)
            .set_always("updated_by", user.id)
            .set_always("last_activity", chrono::Utc::now());

        let board = update
            .finish(board_id)
            .build_query_as::<Board>()
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Board {} updated by {}", board_id, user.id);
        Ok(board)
    }

    pub async fn delete(&self, user: &CurrentUser, board_id: Uuid) -> Result<(), ApiError> {
        let ctx = self.context(user, board_id).await?;
        if ctx.board.owner_id != user.id {
            return Err(ApiError::forbidden("Only the board owner can delete this board"));
        }

        sqlx::query("UPDATE boards SET deleted_at = NOW(), deleted_by = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(board_id)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Board {} deleted by {}", board_id, user.id);
        Ok(())
    }

    pub async fn reorder_lists(&self, user: &CurrentUser, board_id: Uuid, list_order_ids: Vec<Uuid>) -> Result<Board, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        let order = ordering::dedup(&list_order_ids);
        let board = self
            .set_json(board_id, user.id, "list_order_ids", json!(order))
            .await?;
        Ok(board)
    }

    pub async fn set_view_config(&self, user: &CurrentUser, board_id: Uuid, view_config: Value) -> Result<Board, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;
        self.set_json(board_id, user.id, "view_config", view_config).await
    }

    pub async fn set_recurring_config(
        &self,
        user: &CurrentUser,
        board_id: Uuid,
        input: RecurringConfigInput,
    ) -> Result<Board, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        if let Some(list_id) = input.completed_list_id {
            let exists: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM lists WHERE id = $1 AND board_id = $2 AND deleted_at IS NULL",
            )
            .bind(list_id)
            .bind(board_id)
            .fetch_optional(&self.pool)
            .await?;
            if exists.is_none() {
                return Err(ApiError::invalid_field("completedListId", "List does not belong to this board"));
            }
        }

        let config = json!({
            "isRecurring": input.is_recurring,
            "completedListId": input.completed_list_id,
        });
        let board = self.set_json(board_id, user.id, "recurring_config", config).await?;
        tracing::info!(
            "Board {} recurring set to {} by {}",
            board_id,
            input.is_recurring,
            user.id
        );
        Ok(board)
    }

    async fn set_json(&self, board_id: Uuid, user_id: Uuid, column: &'static str, value: Value) -> Result<Board, ApiError> {
        let mut update = UpdateBuilder::new("boards");
        update
            .set_always(column, value)
            .set_always("updated_by", user_id)
            .set_always("last_activity", chrono::Utc::now());
        let board = update
            .finish(board_id)
            .build_query_as::<Board>()
            .fetch_one(&self.pool)
            .await?;
        Ok(board)
    }

    pub async fn members(&self, user: &CurrentUser, board_id: Uuid) -> Result<Vec<MemberView>, ApiError> {
        self.context(user, board_id).await?;
        let sql = board_members_sql();
        let members = sqlx::query_as::<_, MemberView>(&sql)
            .bind(board_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    pub async fn add_member(&self, user: &CurrentUser, board_id: Uuid, input: AddMember) -> Result<MemberView, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        let role = parse_role(input.role.as_deref().unwrap_or("member"))?;
        if role == MemberRole::Owner {
            return Err(ApiError::invalid_field("role", "A board has exactly one owner"));
        }
        self.require_live_user(input.member_id).await?;

        let inserted = sqlx::query(
            "INSERT INTO board_members (board_id, member_id, role) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(board_id)
        .bind(input.member_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(ApiError::conflict("User is already a member of this board"));
        }

        access::touch_board(&self.pool, board_id).await?;
        tracing::info!("User {} added to board {} as {}", input.member_id, board_id, role.as_str());
        self.member(board_id, input.member_id).await
    }

    pub async fn update_member(
        &self,
        user: &CurrentUser,
        board_id: Uuid,
        member_id: Uuid,
        role: &str,
    ) -> Result<MemberView, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        let role = parse_role(role)?;
        if member_id == ctx.board.owner_id || role == MemberRole::Owner {
            return Err(ApiError::bad_request("The board owner's role cannot be changed"));
        }

        let updated = sqlx::query("UPDATE board_members SET role = $3 WHERE board_id = $1 AND member_id = $2")
            .bind(board_id)
            .bind(member_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::not_found("Board member not found"));
        }

        access::touch_board(&self.pool, board_id).await?;
        self.member(board_id, member_id).await
    }

    pub async fn remove_member(&self, user: &CurrentUser, board_id: Uuid, member_id: Uuid) -> Result<(), ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_manage()?;

        if member_id == ctx.board.owner_id {
            return Err(ApiError::bad_request("The board owner cannot be removed"));
        }

        let removed = sqlx::query("DELETE FROM board_members WHERE board_id = $1 AND member_id = $2")
            .bind(board_id)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(ApiError::not_found("Board member not found"));
        }

        access::touch_board(&self.pool, board_id).await?;
        tracing::info!("User {} removed from board {}", member_id, board_id);
        Ok(())
    }

    async fn member(&self, board_id: Uuid, member_id: Uuid) -> Result<MemberView, ApiError> {
        let sql = format!(
            "SELECT {} FROM board_members m JOIN users u ON u.id = m.member_id WHERE m.board_id = $1 AND m.member_id = $2",
            MEMBER_COLUMNS
        );
        sqlx::query_as::<_, MemberView>(&sql)
            .bind(board_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Board member not found"))
    }

    async fn require_live_user(&self, user_id: Uuid) -> Result<(), ApiError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn labels(&self, user: &CurrentUser, board_id: Uuid) -> Result<Vec<Label>, ApiError> {
        self.context(user, board_id).await?;
        let labels = sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE board_id = $1 ORDER BY created_at ASC")
            .bind(board_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(labels)
    }

    pub async fn create_label(&self, user: &CurrentUser, board_id: Uuid, input: CreateLabel) -> Result<Label, ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_edit()?;

        let title = validation::title("title", &input.title, 1, 255)?;
        let label = sqlx::query_as::<_, Label>(
            "INSERT INTO labels (id, board_id, title, color) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(board_id)
        .bind(title)
        .bind(input.color)
        .fetch_one(&self.pool)
        .await?;

        access::touch_board(&self.pool, board_id).await?;
        Ok(label)
    }

    pub async fn delete_label(&self, user: &CurrentUser, board_id: Uuid, label_id: Uuid) -> Result<(), ApiError> {
        let ctx = self.context(user, board_id).await?;
        ctx.require_edit()?;

        let removed = sqlx::query("DELETE FROM labels WHERE id = $1 AND board_id = $2")
            .bind(label_id)
            .bind(board_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(ApiError::not_found("Label not found"));
        }

        access::touch_board(&self.pool, board_id).await?;
        Ok(())
    }
}

/// Members of the given cards, tagged with their card id
pub(crate) async fn card_members(pool: &PgPool, card_ids: &[Uuid]) -> Result<Vec<CardMemberRow>, ApiError> {
    if card_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        r#"
        SELECT m.card_id, {}
        FROM card_members m
        JOIN users u ON u.id = m.member_id
        WHERE m.card_id = ANY($1) AND u.deleted_at IS NULL
        ORDER BY m.joined_at ASC
        "#,
        MEMBER_COLUMNS
    );
    let rows = sqlx::query_as::<_, CardMemberRow>(&sql)
        .bind(card_ids)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

fn board_members_sql() -> String {
    format!(
        r#"
        SELECT {}
        FROM board_members m
        JOIN users u ON u.id = m.member_id
        WHERE m.board_id = $1 AND u.deleted_at IS NULL
        ORDER BY m.joined_at ASC
        "#,
        MEMBER_COLUMNS
    )
}

fn parse_role(raw: &str) -> Result<MemberRole, ApiError> {
    raw.parse::<MemberRole>()
        .map_err(|_| ApiError::invalid_field("role", "Role must be one of: owner, admin, member, viewer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_cleared_fields() {
        let input: UpdateBoard = serde_json::from_str(r#"{"description": null, "isPublic": true}"#).unwrap();
        assert_eq!(input.description, Some(None));
        assert_eq!(input.icon, None);
        assert_eq!(input.is_public, Some(true));
    }

    #[test]
    fn roles_are_validated() {
        assert_eq!(parse_role("viewer").unwrap(), MemberRole::Viewer);
        assert_eq!(parse_role("superuser").unwrap_err().status_code(), 400);
    }
}
