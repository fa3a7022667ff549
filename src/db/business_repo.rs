// src/db/business_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::BusinessStore, RbacRepository, UserRepository},
    models::{
        auth::User,
        business::{Business, NewBusiness},
        rbac::NewRole,
        users::NewUser,
    },
    services::catalog::SystemRoleSeed,
};

const BUSINESS_COLUMNS: &str = r#"
    id, name, phone, email, address, business_type, plan,
    onboarding_completed, created_at, updated_at
"#;

#[derive(Clone)]
pub struct BusinessRepository {
    pool: PgPool,
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
}

impl BusinessRepository {
    pub fn new(pool: PgPool, user_repo: UserRepository, rbac_repo: RbacRepository) -> Self {
        Self { pool, user_repo, rbac_repo }
    }
}

#[async_trait]
impl BusinessStore for BusinessRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError> {
        let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1");
        let business = sqlx::query_as::<_, Business>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(business)
    }

    async fn create_with_owner(
        &self,
        business: NewBusiness,
        mut owner: NewUser,
        system_roles: &[SystemRoleSeed],
    ) -> Result<(Business, User), AppError> {
        // 1. Start the transaction
        let mut tx = self.pool.begin().await?;

        // 2. Create the business
        let sql = format!(
            r#"
            INSERT INTO businesses (name, email, business_type)
            VALUES ($1, $2, $3)
            RETURNING {BUSINESS_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Business>(&sql)
            .bind(&business.name)
            .bind(&business.email)
            .bind(&business.business_type)
            .fetch_one(&mut *tx)
            .await?;

        // 3. Seed its system roles with their default permissions
        for seed in system_roles {
            let role = self
                .rbac_repo
                .insert_role(
                    &mut *tx,
                    &NewRole {
                        business_id: created.id,
                        name: seed.role.as_str().to_string(),
                        description: Some(seed.description.to_string()),
                        level: seed.level,
                        is_system: true,
                    },
                )
                .await?;

            self.rbac_repo
                .assign_permissions_by_names(&mut *tx, role.id, seed.permissions)
                .await?;

            if seed.role == owner.role {
                owner.role_id = Some(role.id);
            }
        }

        // 4. Create the owner, linked to the OWNER role
        owner.business_id = created.id;
        let user = self.user_repo.insert(&mut *tx, &owner).await?;

        // 5. Commit
        tx.commit().await?;

        Ok((created, user))
    }
}
