use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::access::{self, BoardContext};
use super::board_service::{card_members, MEMBER_COLUMNS};
use super::validation;
use crate::board_view::CardView;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Card, CardWithBoard, List, MemberView};
use crate::database::patch::{deserialize_some, UpdateBuilder};
use crate::error::ApiError;
use crate::filter::{arrange_user_cards, CardQuery, UserCardPage};
use crate::middleware::CurrentUser;
use crate::ordering;
use crate::types::{card_status, MemberRole, CARD_PRIORITIES};

const CARD_STATUSES: [&str; 4] = [
    card_status::TODO,
    card_status::IN_PROGRESS,
    card_status::DONE,
    card_status::COMPLETED,
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCard {
    pub list_id: Uuid,
    pub board_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub checklist_items: Option<Value>,
    pub labels: Option<Value>,
    pub dependencies: Option<Value>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub list_id: Option<Uuid>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub priority: Option<Option<String>>,
    pub checklist_items: Option<Value>,
    pub labels: Option<Value>,
    pub dependencies: Option<Value>,
    pub metadata: Option<Value>,
    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCard {
    pub list_id: Uuid,
    pub index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyCard {
    pub list_id: Option<Uuid>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCardMember {
    pub member_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomField {
    pub field_name: String,
    pub field_value: Value,
    pub field_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomField {
    pub field_value: Value,
}

pub struct CardService {
    pool: PgPool,
}

impl CardService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    async fn load_list(&self, list_id: Uuid) -> Result<List, ApiError> {
        sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = $1 AND deleted_at IS NULL")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("List not found"))
    }

    async fn readable(&self, user: &CurrentUser, card_id: Uuid) -> Result<(Card, BoardContext), ApiError> {
        readable_card(&self.pool, user, card_id).await
    }

    async fn writable(&self, user: &CurrentUser, card_id: Uuid) -> Result<(Card, BoardContext), ApiError> {
        let (card, ctx) = self.readable(user, card_id).await?;
        ctx.require_edit()?;
        Ok((card, ctx))
    }

    pub async fn create(&self, user: &CurrentUser, input: CreateCard) -> Result<Card, ApiError> {
        let title = validation::title("title", &input.title, 1, 255)?;
        validate_status(input.status.as_deref())?;
        validate_priority(input.priority.as_deref())?;

        let list = self.load_list(input.list_id).await?;
        if input.board_id.is_some_and(|board_id| board_id != list.board_id) {
            return Err(ApiError::invalid_field("boardId", "List does not belong to this board"));
        }
        let ctx = access::load_board(&self.pool, user, list.board_id).await?;
        ctx.require_edit()?;

        let mut tx = self.pool.begin().await?;

        let card = sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (id, board_id, list_id, title, description, position,
                               due_date, start_date, end_date, card_type, status, priority,
                               checklist_items, labels, dependencies, metadata,
                               created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM cards WHERE list_id = $3 AND deleted_at IS NULL),
                    $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(list.board_id)
        .bind(list.id)
        .bind(&title)
        .bind(&input.description)
        .bind(input.due_date)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.card_type.as_deref().unwrap_or("normal"))
        .bind(input.status.as_deref().unwrap_or(card_status::TODO))
        .bind(&input.priority)
        .bind(input.checklist_items.unwrap_or_else(|| json!([])))
        .bind(input.labels.unwrap_or_else(|| json!([])))
        .bind(input.dependencies.unwrap_or_else(|| json!([])))
        .bind(input.metadata.unwrap_or_else(|| json!({})))
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

        append_to_list(&mut tx, list.id, card.id).await?;
        add_member(&mut tx, card.id, user.id, MemberRole::Member).await?;
        access::touch_board(&mut *tx, list.board_id).await?;

        tx.commit().await?;

        tracing::info!("Card {} '{}' created in list {}", card.id, card.title, list.id);
        Ok(card)
    }

    /// Cards of one list in the list's stored order
    pub async fn by_list(&self, user: &CurrentUser, board_id: Option<Uuid>, list_id: Uuid) -> Result<Vec<CardView>, ApiError> {
        let list = self.load_list(list_id).await?;
        if board_id.is_some_and(|board_id| board_id != list.board_id) {
            return Err(ApiError::not_found("List not found"));
        }
        let ctx = access::load_board(&self.pool, user, list.board_id).await?;

        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT * FROM cards
            WHERE list_id = $1 AND deleted_at IS NULL AND archived = FALSE
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        let card_ids: Vec<Uuid> = cards.iter().map(|c| c.id).collect();
        let mut members = std::collections::HashMap::<Uuid, Vec<MemberView>>::new();
        for row in card_members(&self.pool, &card_ids).await? {
            members.entry(row.card_id).or_default().push(row.member);
        }

        let visible: Vec<Card> = cards
            .into_iter()
            .filter(|c| {
                ctx.access.sees_all_cards()
                    || c.created_by == Some(user.id)
                    || members
                        .get(&c.id)
                        .is_some_and(|ms| ms.iter().any(|m| m.member_id == user.id))
            })
            .collect();

        let ordered = ordering::reconcile(&list.card_order_ids.0, visible, |c| c.id);
        Ok(ordered
            .into_iter()
            .map(|card| CardView {
                members: members.remove(&card.id).unwrap_or_default(),
                card,
            })
            .collect())
    }

    /// Cards the user created or is a member of, across all boards
    pub async fn user_cards(&self, user: &CurrentUser, query: &CardQuery) -> Result<UserCardPage, ApiError> {
        let cards = sqlx::query_as::<_, CardWithBoard>(
            r#"
            SELECT c.*, b.title AS board_title, l.title AS list_title, b.recurring_config
            FROM cards c
            JOIN boards b ON b.id = c.board_id
            JOIN lists l ON l.id = c.list_id
            WHERE (c.created_by = $1
                   OR EXISTS (SELECT 1 FROM card_members cm WHERE cm.card_id = c.id AND cm.member_id = $1))
              AND c.deleted_at IS NULL AND c.archived = FALSE
              AND b.deleted_at IS NULL
              AND l.deleted_at IS NULL
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        let order: Option<(Json<Vec<Uuid>>,)> =
            sqlx::query_as("SELECT card_order_ids FROM users WHERE id = $1")
                .bind(user.id)
                .fetch_optional(&self.pool)
                .await?;
        let order = order.map(|(o,)| o.0).unwrap_or_default();

        Ok(arrange_user_cards(cards, &order, query))
    }

    pub async fn get(&self, user: &CurrentUser, card_id: Uuid) -> Result<CardView, ApiError> {
        let (card, _) = self.readable(user, card_id).await?;
        let members = self.member_views(card.id).await?;
        Ok(CardView { card, members })
    }

    pub async fn update(&self, user: &CurrentUser, card_id: Uuid, input: UpdateCard) -> Result<Card, ApiError> {
        let (card, _) = self.writable(user, card_id).await?;

        let title = validation::optional_title("title", input.title, 1, 255)?;
        validate_status(input.status.as_deref())?;
        validate_priority(input.priority.as_ref().and_then(|p| p.as_deref()))?;

        let target_list = match input.list_id {
            Some(list_id) if list_id != card.list_id => {
                let list = self.load_list(list_id).await?;
                if list.board_id != card.board_id {
                    return Err(ApiError::invalid_field("listId", "Target list is on a different board"));
                }
                Some(list.id)
            }
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        let mut update = UpdateBuilder::new("cards");
        update
            .set("title", title)
            .set("description", input.description)
            .set("list_id", target_list)
            .set("position", input.position)
            .set("due_date", input.due_date)
            .set("start_date", input.start_date)
            .set("end_date", input.end_date)
            .set("card_type", input.card_type)
            .set("status", input.status)
            .set("priority", input.priority)
            .set("checklist_items", input.checklist_items)
            .set("labels", input.labels)
            .set("dependencies", input.dependencies)
            .set("metadata", input.metadata)
            .set("archived", input.archived)
            .set_always("updated_by", user.id);

        let updated = update
            .finish(card.id)
            .build_query_as::<Card>()
            .fetch_one(&mut *tx)
            .await?;

        if let Some(list_id) = target_list {
            remove_from_list(&mut tx, card.list_id, card.id).await?;
            append_to_list(&mut tx, list_id, card.id).await?;
            tracing::info!("Card {} moved from list {} to {}", card.id, card.list_id, list_id);
        }
        access::touch_board(&mut *tx, card.board_id).await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, user: &CurrentUser, card_id: Uuid) -> Result<(), ApiError> {
        let (card, _) = self.writable(user, card_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE cards SET deleted_at = NOW(), deleted_by = $2, is_tracking = FALSE WHERE id = $1")
            .bind(card.id)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        remove_from_list(&mut tx, card.list_id, card.id).await?;
        access::touch_board(&mut *tx, card.board_id).await?;
        tx.commit().await?;

        tracing::info!("Card {} deleted by {}", card.id, user.id);
        Ok(())
    }

    /// Move a card into `list_id` at `index`, or to the end of the list
    pub async fn move_card(&self, user: &CurrentUser, card_id: Uuid, input: MoveCard) -> Result<Card, ApiError> {
        let (card, _) = self.writable(user, card_id).await?;
        let target = self.load_list(input.list_id).await?;
        if target.board_id != card.board_id {
            return Err(ApiError::invalid_field("listId", "Target list is on a different board"));
        }

        let mut tx = self.pool.begin().await?;

        if target.id != card.list_id {
            remove_from_list(&mut tx, card.list_id, card.id).await?;
        }

        let (order,): (Json<Vec<Uuid>>,) =
            sqlx::query_as("SELECT card_order_ids FROM lists WHERE id = $1 FOR UPDATE")
                .bind(target.id)
                .fetch_one(&mut *tx)
                .await?;
        let mut order = order.0;
        ordering::insert_id(&mut order, card.id, input.index);
        let position = order.iter().position(|id| *id == card.id).unwrap_or(0) as i32;

        sqlx::query("UPDATE lists SET card_order_ids = $2, updated_at = NOW() WHERE id = $1")
            .bind(target.id)
            .bind(json!(order))
            .execute(&mut *tx)
            .await?;

        let moved = sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards SET list_id = $2, position = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(card.id)
        .bind(target.id)
        .bind(position)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

        access::touch_board(&mut *tx, card.board_id).await?;
        tx.commit().await?;

        tracing::info!("Card {} moved to list {} at {}", card.id, target.id, position);
        Ok(moved)
    }

    /// Duplicate a card with fresh tracking and the same members
    pub async fn copy(&self, user: &CurrentUser, card_id: Uuid, input: CopyCard) -> Result<Card, ApiError> {
        let (card, _) = self.writable(user, card_id).await?;
        let target_list = input.list_id.unwrap_or(card.list_id);
        if target_list != card.list_id {
            let list = self.load_list(target_list).await?;
            if list.board_id != card.board_id {
                return Err(ApiError::invalid_field("listId", "Target list is on a different board"));
            }
        }
        let title = match input.title {
            Some(title) => validation::title("title", &title, 1, 255)?,
            None => card.title.clone(),
        };

        let mut tx = self.pool.begin().await?;
        let copy = duplicate(&mut tx, &card, target_list, &title, card.due_date, user.id).await?;

        let (order,): (Json<Vec<Uuid>>,) =
            sqlx::query_as("SELECT card_order_ids FROM lists WHERE id = $1 FOR UPDATE")
                .bind(target_list)
                .fetch_one(&mut *tx)
                .await?;
        let mut order = order.0;
        if target_list == card.list_id {
            ordering::insert_after(&mut order, copy.id, card.id);
        } else {
            ordering::insert_id(&mut order, copy.id, None);
        }
        sqlx::query("UPDATE lists SET card_order_ids = $2, updated_at = NOW() WHERE id = $1")
            .bind(target_list)
            .bind(json!(order))
            .execute(&mut *tx)
            .await?;

        access::touch_board(&mut *tx, card.board_id).await?;
        tx.commit().await?;

        tracing::info!("Card {} copied to {}", card.id, copy.id);
        Ok(copy)
    }

    pub async fn set_archived(&self, user: &CurrentUser, card_id: Uuid, archived: bool) -> Result<Card, ApiError> {
        self.update(
            user,
            card_id,
            UpdateCard {
                archived: Some(archived),
                ..UpdateCard::default()
            },
        )
        .await
    }

    async fn member_views(&self, card_id: Uuid) -> Result<Vec<MemberView>, ApiError> {
        let rows = card_members(&self.pool, &[card_id]).await?;
        Ok(rows.into_iter().map(|row| row.member).collect())
    }

    pub async fn members(&self, user: &CurrentUser, card_id: Uuid) -> Result<Vec<MemberView>, ApiError> {
        let (card, _) = self.readable(user, card_id).await?;
        self.member_views(card.id).await
    }

    /// Adding an existing member returns the current membership unchanged
    pub async fn add_member(&self, user: &CurrentUser, card_id: Uuid, input: AddCardMember) -> Result<MemberView, ApiError> {
        let (card, _) = self.writable(user, card_id).await?;
        let role = input
            .role
            .as_deref()
            .unwrap_or("member")
            .parse::<MemberRole>()
            .map_err(|_| ApiError::invalid_field("role", "Role must be one of: owner, admin, member, viewer"))?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(input.member_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(ApiError::not_found("User not found"));
        }

        let mut tx = self.pool.begin().await?;
        add_member(&mut tx, card.id, input.member_id, role).await?;
        access::touch_board(&mut *tx, card.board_id).await?;
        tx.commit().await?;

        let sql = format!(
            "SELECT {} FROM card_members m JOIN users u ON u.id = m.member_id WHERE m.card_id = $1 AND m.member_id = $2",
            MEMBER_COLUMNS
        );
        let member = sqlx::query_as::<_, MemberView>(&sql)
            .bind(card.id)
            .bind(input.member_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(member)
    }

    pub async fn remove_member(&self, user: &CurrentUser, card_id: Uuid, member_id: Uuid) -> Result<(), ApiError> {
        let (card, _) = self.writable(user, card_id).await?;
        let removed = sqlx::query("DELETE FROM card_members WHERE card_id = $1 AND member_id = $2")
            .bind(card.id)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(ApiError::not_found("Card member not found"));
        }
        access::touch_board(&self.pool, card.board_id).await?;
        Ok(())
    }

    pub async fn custom_fields(&self, user: &CurrentUser, card_id: Uuid) -> Result<Value, ApiError> {
        let (card, _) = self.readable(user, card_id).await?;
        Ok(card
            .metadata
            .get(CUSTOM_FIELDS)
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    pub async fn add_custom_field(&self, user: &CurrentUser, card_id: Uuid, input: CreateCustomField) -> Result<Card, ApiError> {
        let name = input.field_name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::invalid_field("fieldName", "Field name is required"));
        }
        let field_type = input.field_type.unwrap_or_else(|| "string".to_string());
        self.edit_metadata(user, card_id, |metadata| {
            insert_custom_field(metadata, &name, input.field_value, &field_type)
        })
        .await
    }

    pub async fn update_custom_field(
        &self,
        user: &CurrentUser,
        card_id: Uuid,
        name: &str,
        input: UpdateCustomField,
    ) -> Result<Card, ApiError> {
        self.edit_metadata(user, card_id, |metadata| {
            update_custom_field(metadata, name, input.field_value)
        })
        .await
    }

    pub async fn remove_custom_field(&self, user: &CurrentUser, card_id: Uuid, name: &str) -> Result<Card, ApiError> {
        self.edit_metadata(user, card_id, |metadata| remove_custom_field(metadata, name))
            .await
    }

    async fn edit_metadata<F>(&self, user: &CurrentUser, card_id: Uuid, edit: F) -> Result<Card, ApiError>
    where
        F: FnOnce(&mut Value) -> Result<(), ApiError>,
    {
        let (card, _) = self.writable(user, card_id).await?;

        let mut tx = self.pool.begin().await?;
        let (mut metadata,): (Value,) = sqlx::query_as("SELECT metadata FROM cards WHERE id = $1 FOR UPDATE")
            .bind(card.id)
            .fetch_one(&mut *tx)
            .await?;
        edit(&mut metadata)?;

        let updated = sqlx::query_as::<_, Card>(
            "UPDATE cards SET metadata = $2, updated_by = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(card.id)
        .bind(metadata)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(updated)
    }
}

/// Load a card the user may read. Under member access only cards the user
/// created or belongs to are visible.
pub(crate) async fn readable_card(pool: &PgPool, user: &CurrentUser, card_id: Uuid) -> Result<(Card, BoardContext), ApiError> {
    let card = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 AND deleted_at IS NULL")
        .bind(card_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Card not found"))?;
    let ctx = access::load_board(pool, user, card.board_id).await?;

    if !ctx.access.sees_all_cards() && card.created_by != Some(user.id) {
        let member: Option<(Uuid,)> =
            sqlx::query_as("SELECT member_id FROM card_members WHERE card_id = $1 AND member_id = $2")
                .bind(card.id)
                .bind(user.id)
                .fetch_optional(pool)
                .await?;
        if member.is_none() {
            return Err(ApiError::not_found("Card not found"));
        }
    }
    Ok((card, ctx))
}

/// Insert a copy of `card` into `list_id` without touching any list order.
/// Tracking starts fresh and the card's members are copied over.
pub(crate) async fn duplicate(
    tx: &mut Transaction<'_, Postgres>,
    card: &Card,
    list_id: Uuid,
    title: &str,
    due_date: Option<DateTime<Utc>>,
    actor: Uuid,
) -> Result<Card, ApiError> {
    let copy = sqlx::query_as::<_, Card>(
        r#"
        INSERT INTO cards (id, board_id, list_id, title, description, position,
                           due_date, start_date, end_date, card_type, status, priority,
                           checklist_items, labels, dependencies, metadata,
                           created_by, updated_by)
        SELECT $2, board_id, $3, $4, description, position,
               $5, start_date, end_date, card_type, status, priority,
               checklist_items, labels, dependencies, metadata,
               $6, $6
        FROM cards WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(card.id)
    .bind(Uuid::new_v4())
    .bind(list_id)
    .bind(title)
    .bind(due_date)
    .bind(actor)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO card_members (card_id, member_id, role)
        SELECT $2, member_id, role FROM card_members WHERE card_id = $1
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(card.id)
    .bind(copy.id)
    .execute(&mut **tx)
    .await?;

    Ok(copy)
}

pub(crate) async fn append_to_list(
    tx: &mut Transaction<'_, Postgres>,
    list_id: Uuid,
    card_id: Uuid,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        UPDATE lists
        SET card_order_ids = (card_order_ids - $2::text) || jsonb_build_array($2::text), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(list_id)
    .bind(card_id.to_string())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn remove_from_list(tx: &mut Transaction<'_, Postgres>, list_id: Uuid, card_id: Uuid) -> Result<(), ApiError> {
    sqlx::query("UPDATE lists SET card_order_ids = card_order_ids - $2::text, updated_at = NOW() WHERE id = $1")
        .bind(list_id)
        .bind(card_id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn add_member(
    tx: &mut Transaction<'_, Postgres>,
    card_id: Uuid,
    member_id: Uuid,
    role: MemberRole,
) -> Result<(), ApiError> {
    sqlx::query("INSERT INTO card_members (card_id, member_id, role) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
        .bind(card_id)
        .bind(member_id)
        .bind(role.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn validate_status(status: Option<&str>) -> Result<(), ApiError> {
    status.map_or(Ok(()), |s| validation::one_of("status", s, &CARD_STATUSES))
}

fn validate_priority(priority: Option<&str>) -> Result<(), ApiError> {
    priority.map_or(Ok(()), |p| validation::one_of("priority", p, &CARD_PRIORITIES))
}

const CUSTOM_FIELDS: &str = "customFields";

fn custom_fields_mut(metadata: &mut Value) -> Result<&mut Map<String, Value>, ApiError> {
    if !metadata.is_object() {
        *metadata = json!({});
    }
    let fields = &mut metadata[CUSTOM_FIELDS];
    if !fields.is_object() {
        *fields = json!({});
    }
    fields
        .as_object_mut()
        .ok_or_else(|| ApiError::internal_server_error("Card metadata is malformed"))
}

fn insert_custom_field(metadata: &mut Value, name: &str, value: Value, field_type: &str) -> Result<(), ApiError> {
    let fields = custom_fields_mut(metadata)?;
    if fields.contains_key(name) {
        return Err(ApiError::conflict(format!("Custom field '{}' already exists", name)));
    }
    fields.insert(name.to_string(), json!({ "value": value, "type": field_type }));
    Ok(())
}

fn update_custom_field(metadata: &mut Value, name: &str, value: Value) -> Result<(), ApiError> {
    let field = custom_fields_mut(metadata)?
        .get_mut(name)
        .ok_or_else(|| ApiError::not_found(format!("Custom field '{}' not found", name)))?;
    match field {
        Value::Object(entry) => {
            entry.insert("value".to_string(), value);
        }
        other => *other = json!({ "value": value, "type": "string" }),
    }
    Ok(())
}

fn remove_custom_field(metadata: &mut Value, name: &str) -> Result<(), ApiError> {
    custom_fields_mut(metadata)?
        .remove(name)
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("Custom field '{}' not found", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_field_lifecycle() {
        let mut metadata = json!({"recurringConfig": {"isRecurring": false}});

        insert_custom_field(&mut metadata, "estimate", json!(3), "number").unwrap();
        assert_eq!(metadata["customFields"]["estimate"], json!({"value": 3, "type": "number"}));
        assert_eq!(metadata["recurringConfig"]["isRecurring"], false);

        let dup = insert_custom_field(&mut metadata, "estimate", json!(5), "number").unwrap_err();
        assert_eq!(dup.status_code(), 409);

        update_custom_field(&mut metadata, "estimate", json!(8)).unwrap();
        assert_eq!(metadata["customFields"]["estimate"]["value"], 8);
        assert_eq!(metadata["customFields"]["estimate"]["type"], "number");

        remove_custom_field(&mut metadata, "estimate").unwrap();
        assert_eq!(metadata["customFields"], json!({}));
    }

    #[test]
    fn missing_custom_fields_are_not_found() {
        let mut metadata = Value::Null;
        assert_eq!(update_custom_field(&mut metadata, "x", json!(1)).unwrap_err().status_code(), 404);
        assert_eq!(remove_custom_field(&mut metadata, "x").unwrap_err().status_code(), 404);
    }

    #[test]
    fn update_can_clear_dates() {
        let input: UpdateCard =
            serde_json::from_str(r#"{"dueDate": null, "startDate": "2024-05-01T09:00:00Z"}"#).unwrap();
        assert_eq!(input.due_date, Some(None));
        assert!(input.start_date.unwrap().is_some());
        assert!(input.end_date.is_none());
    }

    #[test]
    fn rejects_unknown_status_and_priority() {
        assert!(validate_status(Some("inProgress")).is_ok());
        assert!(validate_status(Some("blocked")).is_err());
        assert!(validate_priority(None).is_ok());
        assert!(validate_priority(Some("urgent")).is_err());
    }
}
