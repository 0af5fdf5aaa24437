//! Session manager
//!
//! Orchestrates the wallet login flow and the refresh token lifecycle:
//! challenge -> verified signature -> active session, then either rotation
//! (new pair, old refresh token revoked) or revocation (logout).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::crypto::sha256_hex;
use super::signature;
use super::strkey::{self, AddressError};
use super::token::{SessionTokenPayload, TokenCodec, TokenEncodingError, TokenType};
use crate::config::AuthConfig;
use crate::models::{ClientContext, NewRefreshToken};
use crate::store::{NonceStore, RefreshTokenStore, StoreError};

/// First line of every login message
pub const AUTH_MESSAGE_TITLE: &str = "TaskChain Authentication";

/// Login failures
///
/// Expired, used and unknown nonces share one variant.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing walletAddress, nonce, or signature")]
    InvalidPayload,

    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(#[from] AddressError),

    #[error("Signed message does not match expected format")]
    MessageMismatch,

    #[error("Nonce is invalid, expired, or already used")]
    InvalidNonce,

    #[error("Invalid wallet signature")]
    InvalidSignature,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    TokenEncoding(#[from] TokenEncodingError),
}

/// Challenge returned to a wallet before login
#[derive(Debug, Clone)]
pub struct Challenge {
    pub wallet_address: String,
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Login attempt as submitted by the client
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub wallet_address: String,
    pub nonce: String,
    pub signature: String,
    pub message: Option<String>,
}

/// Freshly issued token pair; handed to the transport layer, never stored
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub wallet_address: String,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub refresh_jti: String,
}

/// Identity carried by a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub wallet_address: String,
    pub jti: String,
}

/// Canonical message a wallet signs to log in
pub fn build_auth_message(wallet_address: &str, nonce: &str) -> String {
    let normalized = strkey::normalize(wallet_address);
    [
        AUTH_MESSAGE_TITLE.to_string(),
        format!("Wallet: {}", normalized),
        format!("Nonce: {}", nonce),
    ]
    .join("\n")
}

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    config: AuthConfig,
    codec: TokenCodec,
    nonces: Arc<dyn NonceStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl SessionManager {
    pub fn new(
        config: AuthConfig,
        nonces: Arc<dyn NonceStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        let codec = TokenCodec::new(config.secret.clone());
        Self {
            config,
            codec,
            nonces,
            refresh_tokens,
        }
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issue a login challenge for a wallet
    pub async fn issue_challenge(&self, wallet_address: &str) -> Result<Challenge, AuthError> {
        strkey::decode(wallet_address)?;
        let normalized = strkey::normalize(wallet_address);

        let issued = self
            .nonces
            .issue(&normalized, self.config.nonce_ttl_seconds)
            .await?;

        tracing::debug!(wallet = %normalized, expires_at = %issued.expires_at, "Issued login challenge");

        Ok(Challenge {
            message: build_auth_message(&normalized, &issued.nonce),
            wallet_address: normalized,
            nonce: issued.nonce,
            expires_at: issued.expires_at,
        })
    }

    /// Verify a signed challenge and open a session
    ///
    /// The nonce is only consumed after the signature checks out, so a bad
    /// signature leaves the challenge usable.
    pub async fn login(
        &self,
        request: LoginRequest,
        context: ClientContext,
    ) -> Result<AuthSession, AuthError> {
        let wallet_address = request.wallet_address.trim();
        let nonce = request.nonce.trim();
        let signature = request.signature.trim();

        if wallet_address.is_empty() || nonce.is_empty() || signature.is_empty() {
            return Err(AuthError::InvalidPayload);
        }

        let public_key = strkey::decode(wallet_address)?;
        let normalized = strkey::normalize(wallet_address);
        let nonce_hash = sha256_hex(nonce);
        let expected_message = build_auth_message(&normalized, nonce);

        if let Some(message) = request.message.as_deref().filter(|m| !m.is_empty()) {
            if message != expected_message {
                return Err(AuthError::MessageMismatch);
            }
        }

        if !self.nonces.is_active(&normalized, &nonce_hash).await? {
            return Err(AuthError::InvalidNonce);
        }

        if !signature::verify(&public_key, expected_message.as_bytes(), signature) {
            tracing::info!(wallet = %normalized, "Rejected login with invalid signature");
            return Err(AuthError::InvalidSignature);
        }

        if !self.nonces.consume(&normalized, &nonce_hash).await? {
            tracing::warn!(wallet = %normalized, "Nonce consumed by a concurrent login");
            return Err(AuthError::InvalidNonce);
        }

        self.create_session(&normalized, &context).await
    }

    /// Sign a new access/refresh pair and persist the refresh token
    pub async fn create_session(
        &self,
        wallet_address: &str,
        context: &ClientContext,
    ) -> Result<AuthSession, AuthError> {
        let normalized = strkey::normalize(wallet_address);

        let access = self.codec.sign(
            &normalized,
            &normalized,
            TokenType::Access,
            self.config.access_token_ttl_seconds,
        )?;
        let refresh = self.codec.sign(
            &normalized,
            &normalized,
            TokenType::Refresh,
            self.config.refresh_token_ttl_seconds,
        )?;

        let access_token_expires_at = expires_at(&access.payload)?;
        let refresh_token_expires_at = expires_at(&refresh.payload)?;

        self.refresh_tokens
            .store(NewRefreshToken {
                wallet_address: normalized.clone(),
                jti: refresh.payload.jti.clone(),
                token_hash: sha256_hex(&refresh.token),
                expires_at: refresh_token_expires_at,
                user_agent: context.user_agent.clone(),
                ip_address: context.ip_address.clone(),
            })
            .await?;

        tracing::info!(wallet = %normalized, refresh_jti = %refresh.payload.jti, "Session issued");

        Ok(AuthSession {
            wallet_address: normalized,
            access_token: access.token,
            refresh_token: refresh.token,
            access_token_expires_at,
            refresh_token_expires_at,
            refresh_jti: refresh.payload.jti,
        })
    }

    /// Exchange a refresh token for a new pair
    ///
    /// Returns `Ok(None)` for any token that is not a currently valid refresh
    /// token, including one that was already rotated away. The old token is
    /// revoked only after the new session exists.
    pub async fn rotate_session(
        &self,
        refresh_token: &str,
        context: &ClientContext,
    ) -> Result<Option<AuthSession>, AuthError> {
        let payload = match self.codec.verify_as(refresh_token, TokenType::Refresh) {
            Ok(payload) => payload,
            Err(reason) => {
                tracing::debug!(%reason, "Refresh token rejected");
                return Ok(None);
            }
        };

        let token_hash = sha256_hex(refresh_token);
        let is_valid = self
            .refresh_tokens
            .find_valid(&payload.wallet, &payload.jti, &token_hash)
            .await?;
        if !is_valid {
            tracing::warn!(
                wallet = %payload.wallet,
                jti = %payload.jti,
                "Refresh token reuse or revoked token presented"
            );
            return Ok(None);
        }

        if let Err(e) = self.refresh_tokens.touch(&payload.jti).await {
            tracing::warn!(jti = %payload.jti, error = %e, "Failed to record refresh token use");
        }
        let session = self.create_session(&payload.wallet, context).await?;
        self.refresh_tokens
            .revoke(&payload.jti, Some(&session.refresh_jti))
            .await?;

        tracing::info!(
            wallet = %session.wallet_address,
            old_jti = %payload.jti,
            new_jti = %session.refresh_jti,
            "Session rotated"
        );

        Ok(Some(session))
    }

    /// Revoke the session behind a refresh token; invalid tokens are ignored
    pub async fn revoke_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        let Ok(payload) = self.codec.verify_as(refresh_token, TokenType::Refresh) else {
            return Ok(());
        };

        self.refresh_tokens.revoke(&payload.jti, None).await?;
        tracing::info!(wallet = %payload.wallet, jti = %payload.jti, "Session revoked");

        Ok(())
    }

    /// Verify an access token; every failure looks the same
    pub fn verify_access_token(&self, token: &str) -> Option<AuthContext> {
        self.codec
            .verify_as(token, TokenType::Access)
            .ok()
            .map(|payload| AuthContext {
                wallet_address: payload.wallet,
                jti: payload.jti,
            })
    }
}

fn expires_at(payload: &SessionTokenPayload) -> Result<DateTime<Utc>, TokenEncodingError> {
    DateTime::from_timestamp(payload.exp, 0)
        .ok_or(TokenEncodingError::LifetimeOutOfRange(payload.exp - payload.iat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::SigningSecret;
    use crate::store::MemoryAuthStore;
    use ed25519_dalek::{Signer, SigningKey};

    fn test_config() -> AuthConfig {
        AuthConfig {
            secret: SigningSecret::new(vec![42u8; 32]).unwrap(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604_800,
            nonce_ttl_seconds: 300,
        }
    }

    fn manager() -> (SessionManager, Arc<MemoryAuthStore>) {
        let store = Arc::new(MemoryAuthStore::new());
        let manager = SessionManager::new(test_config(), store.clone(), store.clone());
        (manager, store)
    }

    fn wallet() -> (SigningKey, String) {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let address = strkey::encode(&strkey::RawPublicKey(key.verifying_key().to_bytes()));
        (key, address)
    }

    #[test]
    fn test_build_auth_message() {
        let message = build_auth_message(" gabc ", "n0nce");
        assert_eq!(message, "TaskChain Authentication\nWallet: GABC\nNonce: n0nce");
    }

    #[tokio::test]
    async fn test_issue_challenge_rejects_bad_address() {
        let (manager, store) = manager();
        let result = manager.issue_challenge("GNOTANADDRESS").await;

        assert!(matches!(result, Err(AuthError::InvalidWalletAddress(_))));
        assert!(store.nonces().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (manager, store) = manager();
        let (key, address) = wallet();

        let challenge = manager.issue_challenge(&address.to_lowercase()).await.unwrap();
        assert_eq!(challenge.wallet_address, address);

        let signature = key.sign(challenge.message.as_bytes());
        let session = manager
            .login(
                LoginRequest {
                    wallet_address: address.clone(),
                    nonce: challenge.nonce.clone(),
                    signature: hex::encode(signature.to_bytes()),
                    message: Some(challenge.message.clone()),
                },
                ClientContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(session.wallet_address, address);
        let context = manager.verify_access_token(&session.access_token).unwrap();
        assert_eq!(context.wallet_address, address);
        assert!(manager.verify_access_token(&session.refresh_token).is_none());

        let records = store.refresh_tokens().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].jti, session.refresh_jti);
        assert_eq!(records[0].token_hash, sha256_hex(&session.refresh_token));
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let (manager, _) = manager();
        let result = manager
            .login(
                LoginRequest {
                    wallet_address: "GABC".to_string(),
                    nonce: "   ".to_string(),
                    signature: "00".to_string(),
                    message: None,
                },
                ClientContext::default(),
            )
            .await;

        assert!(matches!(result, Err(AuthError::InvalidPayload)));
    }

    #[tokio::test]
    async fn test_login_message_mismatch_before_nonce_check() {
        let (manager, store) = manager();
        let (key, address) = wallet();
        let challenge = manager.issue_challenge(&address).await.unwrap();

        let result = manager
            .login(
                LoginRequest {
                    wallet_address: address.clone(),
                    nonce: challenge.nonce.clone(),
                    signature: hex::encode(key.sign(b"other").to_bytes()),
                    message: Some("Sign in please".to_string()),
                },
                ClientContext::default(),
            )
            .await;

        assert!(matches!(result, Err(AuthError::MessageMismatch)));
        assert!(store.nonces().await[0].used_at.is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_nonce() {
        let (manager, _) = manager();
        let (key, address) = wallet();
        let message = build_auth_message(&address, "never-issued");

        let result = manager
            .login(
                LoginRequest {
                    wallet_address: address,
                    nonce: "never-issued".to_string(),
                    signature: hex::encode(key.sign(message.as_bytes()).to_bytes()),
                    message: None,
                },
                ClientContext::default(),
            )
            .await;

        assert!(matches!(result, Err(AuthError::InvalidNonce)));
    }

    #[tokio::test]
    async fn test_revoke_session_ignores_garbage() {
        let (manager, _) = manager();
        assert!(manager.revoke_session("garbage").await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_rejects_access_token() {
        let (manager, store) = manager();
        let (_, address) = wallet();
        let session = manager
            .create_session(&address, &ClientContext::default())
            .await
            .unwrap();

        let rotated = manager
            .rotate_session(&session.access_token, &ClientContext::default())
            .await
            .unwrap();
        assert!(rotated.is_none());
        assert_eq!(store.refresh_tokens().await.len(), 1);
    }

    #[tokio::test]
    async fn test_padded_address_uses_canonical_wallet() {
        let (manager, store) = manager();
        let (key, address) = wallet();
        let padded = format!("{}====", address);

        let challenge = manager.issue_challenge(&padded).await.unwrap();
        assert_eq!(challenge.wallet_address, address);
        assert_eq!(challenge.message, build_auth_message(&address, &challenge.nonce));
        assert_eq!(store.nonces().await[0].wallet_address, address);

        let signature = key.sign(challenge.message.as_bytes());
        let session = manager
            .login(
                LoginRequest {
                    wallet_address: padded,
                    nonce: challenge.nonce,
                    signature: hex::encode(signature.to_bytes()),
                    message: None,
                },
                ClientContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(session.wallet_address, address);
        assert_eq!(store.refresh_tokens().await[0].wallet_address, address);
        let payload = manager.token_codec().verify(&session.access_token).unwrap();
        assert_eq!(payload.sub, address);
        assert_eq!(payload.wallet, address);
    }

    #[tokio::test]
    async fn test_out_of_range_ttls_fail_without_panic() {
        let (_, address) = wallet();
        let store = Arc::new(MemoryAuthStore::new());

        let manager = SessionManager::new(
            AuthConfig {
                nonce_ttl_seconds: i64::MAX,
                ..test_config()
            },
            store.clone(),
            store.clone(),
        );
        let result = manager.issue_challenge(&address).await;
        assert!(matches!(
            result,
            Err(AuthError::Store(StoreError::ExpiryOutOfRange(_)))
        ));

        let manager = SessionManager::new(
            AuthConfig {
                refresh_token_ttl_seconds: i64::MAX,
                ..test_config()
            },
            store.clone(),
            store.clone(),
        );
        let result = manager
            .create_session(&address, &ClientContext::default())
            .await;
        assert!(matches!(result, Err(AuthError::TokenEncoding(_))));
        assert!(store.refresh_tokens().await.is_empty());
    }

    #[tokio::test]
    async fn test_rotation_survives_touch_failure() {
        let (_, address) = wallet();
        let inner = Arc::new(MemoryAuthStore::new());
        let refresh_tokens = Arc::new(UntouchableStore(inner.clone()));
        let manager = SessionManager::new(test_config(), inner.clone(), refresh_tokens);

        let session = manager
            .create_session(&address, &ClientContext::default())
            .await
            .unwrap();
        let rotated = manager
            .rotate_session(&session.refresh_token, &ClientContext::default())
            .await
            .unwrap()
            .expect("rotation continues after a failed touch");

        let old = inner.find_by_jti(&session.refresh_jti).await.unwrap().unwrap();
        assert_eq!(old.replaced_by_jti.as_deref(), Some(rotated.refresh_jti.as_str()));
        assert!(old.last_used_at.is_none());
    }

    /// Refresh token store whose `touch` always fails
    struct UntouchableStore(Arc<MemoryAuthStore>);

    #[async_trait::async_trait]
    impl RefreshTokenStore for UntouchableStore {
        async fn store(&self, record: NewRefreshToken) -> Result<(), StoreError> {
            self.0.store(record).await
        }

        async fn find_valid(
            &self,
            wallet_address: &str,
            jti: &str,
            token_hash: &str,
        ) -> Result<bool, StoreError> {
            self.0.find_valid(wallet_address, jti, token_hash).await
        }

        async fn touch(&self, _jti: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("touch disabled".to_string()))
        }

        async fn revoke(&self, jti: &str, replaced_by_jti: Option<&str>) -> Result<(), StoreError> {
            self.0.revoke(jti, replaced_by_jti).await
        }

        async fn find_by_jti(
            &self,
            jti: &str,
        ) -> Result<Option<crate::models::RefreshTokenRecord>, StoreError> {
            self.0.find_by_jti(jti).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let (manager, store) = manager();
        let (_, address) = wallet();
        store.set_unavailable(true);

        let result = manager.issue_challenge(&address).await;
        assert!(matches!(result, Err(AuthError::Store(_))));
    }
}
