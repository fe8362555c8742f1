//! Board lookup plus access resolution for the current user

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::models::Board;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::types::{MemberRole, UserType};
use crate::visibility::{BoardAccess, OwnerProfile};

#[derive(Debug, FromRow)]
struct AccessRow {
    owner_id: Uuid,
    owner_type: String,
    owner_company_id: Option<Uuid>,
    owner_department_id: Option<Uuid>,
    member_role: Option<String>,
}

pub struct BoardContext {
    pub board: Board,
    pub access: BoardAccess,
}

/// Load a live board and resolve what `user` may do with it.
/// Boards the user cannot see are reported as missing.
pub async fn load_board(pool: &PgPool, user: &CurrentUser, board_id: Uuid) -> Result<BoardContext, ApiError> {
    let board = sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = $1 AND deleted_at IS NULL")
        .bind(board_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Board not found"))?;

    let row = sqlx::query_as::<_, AccessRow>(
        r#"
        SELECT b.owner_id,
               u.user_type AS owner_type,
               u.company_id AS owner_company_id,
               u.department_id AS owner_department_id,
               bm.role AS member_role
        FROM boards b
        JOIN users u ON u.id = b.owner_id
        LEFT JOIN board_members bm ON bm.board_id = b.id AND bm.member_id = $2
        WHERE b.id = $1
        "#,
    )
    .bind(board_id)
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    let owner = OwnerProfile {
        id: row.owner_id,
        user_type: row.owner_type.parse().unwrap_or(UserType::Staff),
        company_id: row.owner_company_id,
        department_id: row.owner_department_id,
    };
    let membership = row.member_role.and_then(|r| r.parse::<MemberRole>().ok());
    let access = BoardAccess::resolve(&user.viewer(), &owner, membership);

    if !access.can_view() {
        tracing::debug!("User {} has no access to board {}", user.id, board_id);
        return Err(ApiError::not_found("Board not found"));
    }

    Ok(BoardContext { board, access })
}

impl BoardContext {
    pub fn require_edit(&self) -> Result<(), ApiError> {
        if self.access.can_edit() {
            Ok(())
        } else {
            Err(ApiError::forbidden("You do not have permission to edit this board"))
        }
    }

    pub fn require_manage(&self) -> Result<(), ApiError> {
        if self.access.can_manage() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Only board owners and admins can change this board"))
        }
    }
}

/// Bump the board's last activity timestamp
pub async fn touch_board<'e, E>(executor: E, board_id: Uuid) -> Result<(), ApiError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("UPDATE boards SET last_activity = NOW() WHERE id = $1")
        .bind(board_id)
        .execute(executor)
        .await?;
    Ok(())
}
