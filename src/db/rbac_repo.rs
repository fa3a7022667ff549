// src/db/rbac_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::store::RbacStore,
    models::rbac::{NewRole, Permission, Role, RoleChanges},
    services::catalog::PermissionSeed,
};

const ROLE_COLUMNS: &str =
    "id, business_id, name, description, level, is_system, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

fn map_role_conflict(e: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::RoleNameAlreadyExists(name.to_string());
        }
    }
    e.into()
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Insert a role
    pub async fn insert_role<'e, E>(&self, executor: E, role: &NewRole) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO roles (business_id, name, description, level, is_system)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ROLE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Role>(&sql)
            .bind(role.business_id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.level)
            .bind(role.is_system)
            .fetch_one(executor)
            .await
            .map_err(|e| map_role_conflict(e, &role.name))
    }

    // 2. Bind permissions by id
    pub async fn assign_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    // 3. Bind permissions by name ("orders:read" -> id)
    pub async fn assign_permissions_by_names<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        names: &[&str],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.name = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(names)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RbacStore for RbacRepository {
    async fn sync_permissions(&self, seeds: &[PermissionSeed]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for seed in seeds {
            let (resource, action) = seed.resource_and_action();
            sqlx::query(
                r#"
                INSERT INTO permissions (name, category, action, resource, description)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (name) DO UPDATE SET
                    category = EXCLUDED.category,
                    action = EXCLUDED.action,
                    resource = EXCLUDED.resource,
                    description = EXCLUDED.description
                "#,
            )
            .bind(seed.name)
            .bind(seed.category)
            .bind(action)
            .bind(resource)
            .bind(seed.description)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, name, category, action, resource, description
            FROM permissions
            ORDER BY category, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    async fn find_permissions_by_names(&self, names: &[String]) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, name, category, action, resource, description
            FROM permissions
            WHERE name = ANY($1)
            "#,
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1");
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn find_role_by_name(&self, business_id: Uuid, name: &str) -> Result<Option<Role>, AppError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE business_id = $1 AND name = $2");
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(business_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn find_permissions_by_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name
            FROM role_permissions rp
            JOIN permissions p ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn list_roles(&self, business_id: Uuid) -> Result<Vec<Role>, AppError> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE business_id = $1 ORDER BY level DESC, name"
        );
        let roles = sqlx::query_as::<_, Role>(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn create_role(&self, role: NewRole, permission_ids: &[Uuid]) -> Result<Role, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = self.insert_role(&mut *tx, &role).await?;
        if !permission_ids.is_empty() {
            self.assign_permissions(&mut *tx, created.id, permission_ids).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_role(
        &self,
        id: Uuid,
        changes: RoleChanges,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<Role, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE roles SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                level = COALESCE($4, level),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        );
        let conflict_name = changes.name.clone().unwrap_or_default();
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.level)
            .bind(changes.is_active)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_role_conflict(e, &conflict_name))?
            .ok_or_else(|| AuthzError::NotFound("Role".into()))?;

        if let Some(ids) = permission_ids {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if !ids.is_empty() {
                self.assign_permissions(&mut *tx, id, ids).await?;
            }
        }

        tx.commit().await?;
        Ok(role)
    }

    async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        // role_permissions rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound("Role".into()).into());
        }
        Ok(())
    }
}
