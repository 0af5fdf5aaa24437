//! In-process store used by tests and local tooling

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NonceStore, RefreshTokenStore, StoreError};
use crate::models::{AuthNonce, NewNonce, NewRefreshToken, RefreshTokenRecord};

/// Both stores over plain vectors
///
/// Each operation holds the table lock for its whole check-and-update, which
/// gives the same single-winner guarantee as the conditional SQL update.
#[derive(Default)]
pub struct MemoryAuthStore {
    nonces: Mutex<Vec<AuthNonce>>,
    refresh_tokens: Mutex<Vec<RefreshTokenRecord>>,
    unavailable: AtomicBool,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn nonces(&self) -> Vec<AuthNonce> {
        self.nonces.lock().await.clone()
    }

    pub async fn refresh_tokens(&self) -> Vec<RefreshTokenRecord> {
        self.refresh_tokens.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NonceStore for MemoryAuthStore {
    async fn save(&self, nonce: NewNonce) -> Result<(), StoreError> {
        self.check_available()?;

        self.nonces.lock().await.push(AuthNonce {
            id: Uuid::new_v4(),
            wallet_address: nonce.wallet_address,
            nonce_hash: nonce.nonce_hash,
            expires_at: nonce.expires_at,
            used_at: None,
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn is_active(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = Utc::now();

        Ok(self.nonces.lock().await.iter().any(|n| {
            n.wallet_address == wallet_address && n.nonce_hash == nonce_hash && n.is_active(now)
        }))
    }

    async fn consume(&self, wallet_address: &str, nonce_hash: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let mut nonces = self.nonces.lock().await;

        // Later rows were created later; scan newest first
        let target = nonces.iter_mut().rev().find(|n| {
            n.wallet_address == wallet_address && n.nonce_hash == nonce_hash && n.is_active(now)
        });

        match target {
            Some(nonce) => {
                nonce.used_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryAuthStore {
    async fn store(&self, record: NewRefreshToken) -> Result<(), StoreError> {
        self.check_available()?;

        self.refresh_tokens.lock().await.push(RefreshTokenRecord {
            id: Uuid::new_v4(),
            wallet_address: record.wallet_address,
            jti: record.jti,
            token_hash: record.token_hash,
            expires_at: record.expires_at,
            user_agent: record.user_agent,
            ip_address: record.ip_address,
            revoked_at: None,
            replaced_by_jti: None,
            last_used_at: None,
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn find_valid(
        &self,
        wallet_address: &str,
        jti: &str,
        token_hash: &str,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = Utc::now();

        Ok(self.refresh_tokens.lock().await.iter().any(|r| {
            r.wallet_address == wallet_address
                && r.jti == jti
                && r.token_hash == token_hash
                && r.is_valid(now)
        }))
    }

    async fn touch(&self, jti: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let now = Utc::now();

        for record in self.refresh_tokens.lock().await.iter_mut() {
            if record.jti == jti {
                record.last_used_at = Some(now);
            }
        }

        Ok(())
    }

    async fn revoke(&self, jti: &str, replaced_by_jti: Option<&str>) -> Result<(), StoreError> {
        self.check_available()?;
        let now = Utc::now();

        for record in self.refresh_tokens.lock().await.iter_mut() {
            if record.jti == jti && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                if record.replaced_by_jti.is_none() {
                    record.replaced_by_jti = replaced_by_jti.map(str::to_string);
                }
            }
        }

        Ok(())
    }

    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.check_available()?;

        Ok(self
            .refresh_tokens
            .lock()
            .await
            .iter()
            .find(|r| r.jti == jti)
            .cloned())
    }
}
