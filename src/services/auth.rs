// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::{BusinessStore, UserStore},
    models::{
        auth::{Claims, RegisterUserPayload, User, UserRole},
        business::NewBusiness,
        users::NewUser,
    },
    services::catalog::SYSTEM_ROLES,
};

pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    businesses: Arc<dyn BusinessStore>,
    jwt_secret: String,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        businesses: Arc<dyn BusinessStore>,
        jwt_secret: String,
        bcrypt_cost: u32,
    ) -> Self {
        Self { users, businesses, jwt_secret, bcrypt_cost }
    }

    /// Hashes on a blocking thread; bcrypt is slow on purpose.
    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
        Ok(hashed)
    }

    /// Opens a business with its owner and returns the owner's token.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        // 1. Hashing (outside the transaction, it does not touch the database)
        let password_hash = self.hash_password(&payload.password).await?;

        // 2. Business + system roles + owner, in one transaction
        let (business, owner) = self
            .businesses
            .create_with_owner(
                NewBusiness {
                    name: payload.business_name.clone(),
                    email: Some(payload.email.clone()),
                    business_type: payload.business_type.clone(),
                },
                NewUser {
                    email: payload.email.clone(),
                    name: Some(payload.name.clone()),
                    password_hash,
                    role: UserRole::Owner,
                    role_id: None,
                    business_id: uuid::Uuid::nil(),
                },
                SYSTEM_ROLES,
            )
            .await?;

        tracing::info!(business_id = %business.id, user_id = %owner.id, "Business registered");

        // 3. Token
        self.create_token(&owner)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();

        // Verification runs on a blocking thread
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        self.create_token(&user)
    }

    /// Verifies signature and expiry. Any failure is `InvalidToken`.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    /// Token -> live, active user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = self.validate_token(token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Token presented for inactive account");
            return Err(AppError::InactiveAccount);
        }

        Ok(user)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            business_id: user.business_id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
