//! Authentication models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Login challenge row; only the nonce digest is stored
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AuthNonce {
    pub id: Uuid,
    pub wallet_address: String,
    pub nonce_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthNonce {
    /// Unused and not yet expired
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

/// Values needed to persist a new challenge
#[derive(Debug, Clone)]
pub struct NewNonce {
    pub wallet_address: String,
    pub nonce_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Refresh token metadata; rows are never deleted
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub wallet_address: String,
    pub jti: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by_jti: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Values needed to persist a newly issued refresh token
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub wallet_address: String,
    pub jti: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Advisory request metadata recorded with a refresh token
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for a login challenge
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    #[serde(default)]
    #[validate(length(max = 128))]
    pub wallet_address: Option<String>,
}

/// Login challenge handed back to the wallet
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub wallet_address: String,
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to verify a signed challenge
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    #[validate(length(max = 128))]
    pub wallet_address: Option<String>,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub nonce: Option<String>,
    /// Hex or base64 encoded ed25519 signature
    #[serde(default)]
    #[validate(length(max = 512))]
    pub signature: Option<String>,
    /// Optional copy of the signed message; must match the canonical one
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub message: Option<String>,
}

/// Refresh token supplied in the body when no cookie is present
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Session expiries returned after login or rotation
///
/// The tokens themselves travel in cookies.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub wallet_address: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWalletResponse {
    pub wallet_address: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub ok: bool,
}
