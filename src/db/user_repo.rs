// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::store::UserStore,
    models::{
        auth::{OverrideEffect, User},
        rbac::Role,
        users::{NewUser, UserChanges},
    },
};

const USER_COLUMNS: &str = r#"
    id, email, name, password_hash, role, role_id, business_id,
    is_active, custom_permissions, created_at, updated_at
"#;

// Everything that touches the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a user on any executor, so registration can run it inside its transaction.
    pub async fn insert<'e, E>(&self, executor: E, new_user: &NewUser) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, role_id, business_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.password_hash)
            .bind(new_user.role)
            .bind(new_user.role_id)
            .bind(new_user.business_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                e.into()
            })
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE business_id = $1 ORDER BY created_at"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        self.insert(&self.pool, &new_user).await
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                role_id = COALESCE($4, role_id),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.role)
            .bind(changes.role_id)
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_permission_override(
        &self,
        id: Uuid,
        permission: &str,
        effect: OverrideEffect,
    ) -> Result<(), AppError> {
        // Rebuilt from the row under its update lock
        let result = sqlx::query(
            r#"
            UPDATE users SET
                custom_permissions = COALESCE(
                    (SELECT jsonb_agg(o)
                     FROM jsonb_array_elements(custom_permissions) AS o
                     WHERE o->>'permission' <> $2),
                    '[]'::jsonb
                ) || jsonb_build_array(jsonb_build_object('permission', $2::text, 'effect', $3::text)),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(permission)
        .bind(effect.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound("User".into()).into());
        }
        Ok(())
    }

    async fn list_ids_holding_role(&self, role: &Role) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM users
            WHERE role_id = $1
               OR ($2 AND role_id IS NULL AND business_id = $3 AND role::text = $4)
            "#,
        )
        .bind(role.id)
        .bind(role.is_system)
        .bind(role.business_id)
        .bind(&role.name)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn count_by_role_id(&self, role_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
