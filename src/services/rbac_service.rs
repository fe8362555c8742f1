use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::validation;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Permission, Role};
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub const USERS_MANAGE: &str = "users.manage";
pub const ORGANIZATION_MANAGE: &str = "organization.manage";
pub const RBAC_MANAGE: &str = "rbac.manage";

/// Body for creating or updating a role or a permission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionIds {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleIds {
    pub role_ids: Vec<Uuid>,
}

/// Table a named RBAC record lives in
#[derive(Debug, Clone, Copy)]
enum Catalog {
    Roles,
    Permissions,
}

impl Catalog {
    fn table(&self) -> &'static str {
        match self {
            Catalog::Roles => "roles",
            Catalog::Permissions => "permissions",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Catalog::Roles => "Role",
            Catalog::Permissions => "Permission",
        }
    }
}

pub struct RbacService {
    pool: PgPool,
}

impl RbacService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Admins hold every permission. Everyone else needs a direct grant or a role granting it.
    pub async fn has_permission(&self, user: &CurrentUser, name: &str) -> Result<bool, ApiError> {
        if user.is_admin() {
            return Ok(true);
        }
        let (granted,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_permissions up
                JOIN permissions p ON p.id = up.permission_id
                WHERE up.user_id = $1 AND p.name = $2
                UNION ALL
                SELECT 1 FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.name = $2
            )
            "#,
        )
        .bind(user.id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(granted)
    }

    pub async fn require_permission(&self, user: &CurrentUser, name: &str) -> Result<(), ApiError> {
        if self.has_permission(user, name).await? {
            Ok(())
        } else {
            tracing::warn!("User {} lacks permission {}", user.id, name);
            Err(ApiError::forbidden(format!("Permission '{}' required", name)))
        }
    }

    pub async fn roles(&self) -> Result<Vec<Role>, ApiError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn role(&self, id: Uuid) -> Result<Role, ApiError> {
        self.get(Catalog::Roles, id).await
    }

    pub async fn create_role(&self, input: NamedInput) -> Result<Role, ApiError> {
        self.create(Catalog::Roles, input).await
    }

    pub async fn update_role(&self, id: Uuid, input: NamedInput) -> Result<Role, ApiError> {
        self.update(Catalog::Roles, id, input).await
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete(Catalog::Roles, id).await
    }

    pub async fn permissions(&self) -> Result<Vec<Permission>, ApiError> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    pub async fn permission(&self, id: Uuid) -> Result<Permission, ApiError> {
        self.get(Catalog::Permissions, id).await
    }

    pub async fn create_permission(&self, input: NamedInput) -> Result<Permission, ApiError> {
        self.create(Catalog::Permissions, input).await
    }

    pub async fn update_permission(&self, id: Uuid, input: NamedInput) -> Result<Permission, ApiError> {
        self.update(Catalog::Permissions, id, input).await
    }

    pub async fn delete_permission(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete(Catalog::Permissions, id).await
    }

    async fn get<T>(&self, catalog: Catalog, id: Uuid) -> Result<T, ApiError>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE id = $1", catalog.table());
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{} not found", catalog.noun())))
    }

    async fn create<T>(&self, catalog: Catalog, input: NamedInput) -> Result<T, ApiError>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let name = validation::title("name", input.name.as_deref().unwrap_or_default(), 1, 100)?;
        let sql = format!(
            "INSERT INTO {} (id, name, description) VALUES ($1, $2, $3) RETURNING *",
            catalog.table()
        );
        let created = sqlx::query_as::<_, T>(&sql)
            .bind(Uuid::new_v4())
            .bind(&name)
            .bind(input.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| duplicate_name(e, catalog))?;

        tracing::info!("{} '{}' created", catalog.noun(), name);
        Ok(created)
    }

    async fn update<T>(&self, catalog: Catalog, id: Uuid, input: NamedInput) -> Result<T, ApiError>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let name = validation::optional_title("name", input.name, 1, 100)?;
        let sql = format!(
            r#"
            UPDATE {}
            SET name = COALESCE($2, name), description = COALESCE($3, description), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            catalog.table()
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(name)
            .bind(input.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| duplicate_name(e, catalog))?
            .ok_or_else(|| ApiError::not_found(format!("{} not found", catalog.noun())))
    }

    async fn delete(&self, catalog: Catalog, id: Uuid) -> Result<(), ApiError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", catalog.table());
        let deleted = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::not_found(format!("{} not found", catalog.noun())));
        }
        tracing::info!("{} {} deleted", catalog.noun(), id);
        Ok(())
    }

    pub async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, ApiError> {
        self.role(role_id).await?;
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    /// Replace the role's permission set
    pub async fn set_role_permissions(&self, role_id: Uuid, permission_ids: Vec<Uuid>) -> Result<Vec<Permission>, ApiError> {
        self.role(role_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(&permission_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Role {} now grants {} permissions", role_id, permission_ids.len());
        self.role_permissions(role_id).await
    }

    pub async fn user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, ApiError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    pub async fn set_user_roles(&self, user_id: Uuid, role_ids: Vec<Uuid>) -> Result<Vec<Role>, ApiError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r WHERE r.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&role_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.user_roles(user_id).await
    }

    pub async fn user_direct_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, ApiError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN user_permissions up ON up.permission_id = p.id
            WHERE up.user_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    pub async fn set_user_permissions(&self, user_id: Uuid, permission_ids: Vec<Uuid>) -> Result<Vec<Permission>, ApiError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&permission_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.user_direct_permissions(user_id).await
    }

    /// Role grants united with direct grants
    pub async fn effective_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, ApiError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT DISTINCT p.* FROM permissions p
            WHERE p.id IN (
                SELECT up.permission_id FROM user_permissions up WHERE up.user_id = $1
                UNION
                SELECT rp.permission_id FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                WHERE ur.user_id = $1
            )
            ORDER BY p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }
}

fn duplicate_name(err: sqlx::Error, catalog: Catalog) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict(format!("{} name already exists", catalog.noun()))
        }
        _ => err.into(),
    }
}
