//! Refresh token persistence
//!
//! Rows form a revocation chain: rotation revokes the old row and points it
//! at its replacement, logout revokes without a replacement.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;
use crate::models::{NewRefreshToken, RefreshTokenRecord};

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn store(&self, record: NewRefreshToken) -> Result<(), StoreError>;

    /// Matches on all three keys, unrevoked and unexpired
    async fn find_valid(
        &self,
        wallet_address: &str,
        jti: &str,
        token_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Record use of a token
    async fn touch(&self, jti: &str) -> Result<(), StoreError>;

    /// Revoke a token; revoking twice is a no-op
    async fn revoke(&self, jti: &str, replaced_by_jti: Option<&str>) -> Result<(), StoreError>;

    /// Full record by token id, revoked or not
    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;
}

/// Postgres-backed refresh token store (`auth_refresh_tokens`)
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    db_pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn store(&self, record: NewRefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_refresh_tokens (
                id, wallet_address, jti, token_hash, expires_at, user_agent, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.wallet_address)
        .bind(&record.jti)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(&record.user_agent)
        .bind(&record.ip_address)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn find_valid(
        &self,
        wallet_address: &str,
        jti: &str,
        token_hash: &str,
    ) -> Result<bool, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM auth_refresh_tokens
            WHERE wallet_address = $1
              AND jti = $2
              AND token_hash = $3
              AND revoked_at IS NULL
              AND expires_at > NOW()
            LIMIT 1
            "#,
        )
        .bind(wallet_address)
        .bind(jti)
        .bind(token_hash)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.is_some())
    }

    async fn touch(&self, jti: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE auth_refresh_tokens
            SET last_used_at = NOW()
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn revoke(&self, jti: &str, replaced_by_jti: Option<&str>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE auth_refresh_tokens
            SET revoked_at = NOW(),
                replaced_by_jti = COALESCE(replaced_by_jti, $2)
            WHERE jti = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(jti)
        .bind(replaced_by_jti)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as(
            r#"
            SELECT id, wallet_address, jti, token_hash, expires_at, user_agent, ip_address,
                   revoked_at, replaced_by_jti, last_used_at, created_at
            FROM auth_refresh_tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(record)
    }
}
