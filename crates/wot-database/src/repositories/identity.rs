//! PostgreSQL user, credential and role lookups.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wot_core::error::{AppError, ErrorKind};
use wot_core::result::AppResult;
use wot_core::types::{CredentialId, UserId};
use wot_entity::role::{PermissionName, RoleName};
use wot_entity::user::{Credential, User};

use super::traits::{Account, IdentityRepository, NewAccount};

/// Repository over `users`, `credentials` and the role reference tables.
#[derive(Debug, Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    /// Create a new identity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create_account(&self, account: &NewAccount, now: DateTime<Utc>) -> AppResult<Account> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to open transaction", e)
        })?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, public_id, display_name, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(UserId::generate())
        .bind(Uuid::new_v4())
        .bind(&account.display_name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create user", e))?;

        let mut wanted: Vec<String> = account.roles.iter().map(|r| r.0.clone()).collect();
        wanted.sort();
        wanted.dedup();

        let assigned = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, r.id FROM roles r WHERE r.api_name = ANY($2)",
        )
        .bind(user.id)
        .bind(&wanted)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign roles", e))?
        .rows_affected();

        if assigned != wanted.len() as u64 {
            return Err(AppError::validation(format!(
                "Unknown role in {wanted:?}"
            )));
        }

        let credential = sqlx::query_as::<_, Credential>(
            "INSERT INTO credentials (id, user_id, email, password_hash, email_verified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, FALSE, $5, $5) RETURNING *",
        )
        .bind(CredentialId::generate())
        .bind(user.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                AppError::with_source(ErrorKind::Conflict, "Email already in use.", e)
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create credential", e)
            }
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit account creation", e)
        })?;

        Ok(Account { user, credential })
    }

    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_credential(&self, id: CredentialId) -> AppResult<Option<Credential>> {
        sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find credential", e)
            })
    }

    async fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find credential by email", e)
            })
    }

    async fn role_names(&self, user_id: UserId) -> AppResult<Vec<RoleName>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT r.api_name FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 ORDER BY r.api_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))?;
        Ok(names.into_iter().map(RoleName).collect())
    }

    async fn effective_permissions(&self, user_id: UserId) -> AppResult<HashSet<PermissionName>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT p.api_name FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN user_roles ur ON ur.role_id = rp.role_id \
             WHERE ur.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load user permissions", e)
        })?;
        Ok(names.into_iter().map(PermissionName).collect())
    }
}
