//! Login challenge persistence

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;
use crate::auth::crypto::{random_nonce, sha256_hex};
use crate::auth::strkey;
use crate::models::NewNonce;

/// Raw nonce handed to the client; never persisted
#[derive(Debug, Clone)]
pub struct IssuedNonce {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Insert a new unused challenge
    async fn save(&self, nonce: NewNonce) -> Result<(), StoreError>;

    /// `true` iff an unused, unexpired challenge exists for the pair
    async fn is_active(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError>;

    /// Mark the most recent active challenge for the pair as used
    ///
    /// Returns whether a row was affected. Concurrent callers presenting the
    /// same nonce must see exactly one `true`.
    async fn consume(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError>;

    /// Generate, persist and return a fresh challenge nonce
    async fn issue(
        &self,
        wallet_address: &str,
        ttl_seconds: i64,
    ) -> Result<IssuedNonce, StoreError> {
        let nonce = random_nonce();
        let expires_at = Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or(StoreError::ExpiryOutOfRange(ttl_seconds))?;

        self.save(NewNonce {
            wallet_address: strkey::normalize(wallet_address),
            nonce_hash: sha256_hex(&nonce),
            expires_at,
        })
        .await?;

        Ok(IssuedNonce { nonce, expires_at })
    }
}

/// Postgres-backed challenge store (`auth_nonces`)
#[derive(Clone)]
pub struct PgNonceStore {
    db_pool: PgPool,
}

impl PgNonceStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl NonceStore for PgNonceStore {
    async fn save(&self, nonce: NewNonce) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_nonces (id, wallet_address, nonce_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&nonce.wallet_address)
        .bind(&nonce.nonce_hash)
        .bind(nonce.expires_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn is_active(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM auth_nonces
            WHERE wallet_address = $1
              AND nonce_hash = $2
              AND used_at IS NULL
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet_address)
        .bind(nonce_hash)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.is_some())
    }

    async fn consume(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError> {
        // The `used_at IS NULL` re-check makes the update itself the arbiter
        // when two transactions pick the same target row.
        let rows_affected = sqlx::query(
            r#"
            WITH target AS (
                SELECT id
                FROM auth_nonces
                WHERE wallet_address = $1
                  AND nonce_hash = $2
                  AND used_at IS NULL
                  AND expires_at > NOW()
                ORDER BY created_at DESC
                LIMIT 1
            )
            UPDATE auth_nonces
            SET used_at = NOW()
            WHERE id IN (SELECT id FROM target)
              AND used_at IS NULL
            "#,
        )
        .bind(wallet_address)
        .bind(nonce_hash)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
