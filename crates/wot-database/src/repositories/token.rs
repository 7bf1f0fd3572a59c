//! PostgreSQL opaque token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use wot_core::error::{AppError, ErrorKind};
use wot_core::result::AppResult;
use wot_core::types::{CredentialId, TokenId};
use wot_entity::token::{OpaqueToken, TokenKind, TokenState};
use wot_entity::user::Credential;

use super::traits::{ConsumeEffect, ConsumeOutcome, RotateOutcome, TokenRepository};

/// Repository over the `opaque_tokens` table.
#[derive(Debug, Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    /// Create a new token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to open transaction", e))
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

async fn insert_row<'e>(executor: impl PgExecutor<'e>, token: &OpaqueToken) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO opaque_tokens (id, kind, owner_id, token_hash, issued_at, expires_at, invalidated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(token.id)
    .bind(token.kind)
    .bind(token.owner_id)
    .bind(&token.token_hash)
    .bind(token.issued_at)
    .bind(token.expires_at)
    .bind(token.invalidated_at)
    .execute(executor)
    .await
    .map_err(db_error("Failed to insert token"))?;
    Ok(())
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn insert(&self, token: &OpaqueToken) -> AppResult<()> {
        insert_row(&self.pool, token).await
    }

    async fn insert_exclusive(&self, token: &OpaqueToken, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.begin().await?;

        // Serializes concurrent issuers for the same owner and kind until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", token.kind, token.owner_id))
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to lock token owner"))?;

        let retired = sqlx::query(
            "UPDATE opaque_tokens SET invalidated_at = $3 \
             WHERE owner_id = $1 AND kind = $2 AND invalidated_at IS NULL",
        )
        .bind(token.owner_id)
        .bind(token.kind)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to retire previous tokens"))?
        .rows_affected();

        insert_row(&mut *tx, token).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit token issuance"))?;
        Ok(retired)
    }

    async fn find_by_hash(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> AppResult<Option<OpaqueToken>> {
        sqlx::query_as::<_, OpaqueToken>(
            "SELECT * FROM opaque_tokens WHERE kind = $1 AND token_hash = $2",
        )
        .bind(kind)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find token"))
    }

    async fn invalidate(&self, id: TokenId, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE opaque_tokens SET invalidated_at = $2 WHERE id = $1 AND invalidated_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to invalidate token"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn invalidate_all_for_owner(
        &self,
        owner_id: Uuid,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE opaque_tokens SET invalidated_at = $3 \
             WHERE owner_id = $1 AND kind = $2 AND invalidated_at IS NULL AND expires_at > $3",
        )
        .bind(owner_id)
        .bind(kind)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to invalidate owner tokens"))?;
        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        token_hash: &str,
        replacement: &OpaqueToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotateOutcome> {
        let mut tx = self.begin().await?;

        // A concurrent rotation blocks on the row lock and then re-checks
        // `invalidated_at IS NULL`, which no longer holds.
        let previous = sqlx::query_as::<_, OpaqueToken>(
            "UPDATE opaque_tokens SET invalidated_at = $3 \
             WHERE kind = 'refresh' AND token_hash = $1 AND owner_id = $2 \
               AND invalidated_at IS NULL AND expires_at > $3 \
             RETURNING *",
        )
        .bind(token_hash)
        .bind(replacement.owner_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to retire refresh token"))?;

        let Some(previous) = previous else {
            return Ok(RotateOutcome::Rejected);
        };

        insert_row(&mut *tx, replacement).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit rotation"))?;
        Ok(RotateOutcome::Rotated { previous })
    }

    async fn consume(
        &self,
        kind: TokenKind,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: ConsumeEffect,
    ) -> AppResult<ConsumeOutcome> {
        let mut tx = self.begin().await?;

        let claimed = sqlx::query_as::<_, OpaqueToken>(
            "UPDATE opaque_tokens SET invalidated_at = $3 \
             WHERE kind = $1 AND token_hash = $2 AND invalidated_at IS NULL AND expires_at > $3 \
             RETURNING *",
        )
        .bind(kind)
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to claim token"))?;

        let Some(claimed) = claimed else {
            let existing = sqlx::query_as::<_, OpaqueToken>(
                "SELECT * FROM opaque_tokens WHERE kind = $1 AND token_hash = $2",
            )
            .bind(kind)
            .bind(token_hash)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to find token"))?;

            return Ok(match existing {
                Some(token) if token.state(now) == TokenState::Expired => ConsumeOutcome::Expired,
                _ => ConsumeOutcome::Missing,
            });
        };

        let credential_id = CredentialId::from(claimed.owner_id);
        let (credential, sessions_revoked) = match effect {
            ConsumeEffect::VerifyEmail => {
                let credential = sqlx::query_as::<_, Credential>(
                    "UPDATE credentials SET email_verified = TRUE, updated_at = $2 \
                     WHERE id = $1 RETURNING *",
                )
                .bind(credential_id)
                .bind(now)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to mark email verified"))?;
                (credential, 0)
            }
            ConsumeEffect::ResetPassword { password_hash } => {
                let credential = sqlx::query_as::<_, Credential>(
                    "UPDATE credentials SET password_hash = $2, updated_at = $3 \
                     WHERE id = $1 RETURNING *",
                )
                .bind(credential_id)
                .bind(&password_hash)
                .bind(now)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to store new password"))?;

                let Some(credential) = credential else {
                    return Ok(ConsumeOutcome::Missing);
                };

                sqlx::query(
                    "UPDATE opaque_tokens SET invalidated_at = $2 \
                     WHERE owner_id = $1 AND kind = 'password_reset' AND invalidated_at IS NULL",
                )
                .bind(credential_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to retire reset tokens"))?;

                let revoked = sqlx::query(
                    "UPDATE opaque_tokens SET invalidated_at = $2 \
                     WHERE owner_id = $1 AND kind = 'refresh' AND invalidated_at IS NULL AND expires_at > $2",
                )
                .bind(credential.user_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to revoke refresh sessions"))?
                .rows_affected();

                (Some(credential), revoked)
            }
        };

        // Owner row vanished: roll back the claim rather than burn the token.
        let Some(credential) = credential else {
            return Ok(ConsumeOutcome::Missing);
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit token consumption"))?;

        Ok(ConsumeOutcome::Consumed {
            credential,
            sessions_revoked,
        })
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM opaque_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete expired tokens"))?;
        Ok(result.rows_affected())
    }
}
