//! Session token signing and verification
//!
//! Tokens are compact `header.payload.signature` strings: base64url JSON
//! header and payload, followed by a base64url HMAC-SHA256 over the first two
//! segments.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::crypto::random_token_id;
use crate::config::ConfigError;

type HmacSha256 = Hmac<Sha256>;

const HEADER_ALG: &str = "HS256";
const HEADER_TYP: &str = "JWT";

/// Minimum accepted secret length in bytes (256 bits)
pub const MIN_SECRET_BYTES: usize = 32;

/// Shared HMAC key; never printed
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret(MIN_SECRET_BYTES));
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(****)")
    }
}

/// Token type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionTokenPayload {
    /// Subject (wallet address)
    pub sub: String,
    /// Normalized wallet address
    pub wallet: String,
    /// Token id, tracked server-side for refresh tokens
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// A freshly signed token and the claims inside it
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub payload: SessionTokenPayload,
}

/// Why a token was rejected
///
/// Only for logs and tests; callers outside this module see an opaque failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejected {
    #[error("Token is not three non-empty segments")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token header is invalid")]
    BadHeader,

    #[error("Token payload is invalid")]
    BadPayload,

    #[error("Token expired")]
    Expired,

    #[error("Unexpected token type")]
    WrongType,
}

/// Token encoding failures
#[derive(Error, Debug)]
pub enum TokenEncodingError {
    #[error("Token encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token lifetime of {0}s is out of range")]
    LifetimeOutOfRange(i64),
}

/// Signs and verifies session tokens with one shared secret
#[derive(Clone, Debug)]
pub struct TokenCodec {
    secret: SigningSecret,
}

impl TokenCodec {
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    /// Sign a token valid for `ttl_seconds` from now
    pub fn sign(
        &self,
        subject: &str,
        wallet_address: &str,
        token_type: TokenType,
        ttl_seconds: i64,
    ) -> Result<SignedToken, TokenEncodingError> {
        self.sign_at(
            subject,
            wallet_address,
            token_type,
            ttl_seconds,
            Utc::now().timestamp(),
        )
    }

    /// Sign a token as if the current time were `now`
    pub fn sign_at(
        &self,
        subject: &str,
        wallet_address: &str,
        token_type: TokenType,
        ttl_seconds: i64,
        now: i64,
    ) -> Result<SignedToken, TokenEncodingError> {
        let exp = now
            .checked_add(ttl_seconds)
            .filter(|exp| DateTime::<Utc>::from_timestamp(*exp, 0).is_some())
            .ok_or(TokenEncodingError::LifetimeOutOfRange(ttl_seconds))?;

        let payload = SessionTokenPayload {
            sub: subject.to_string(),
            wallet: wallet_address.to_string(),
            jti: random_token_id(),
            token_type,
            iat: now,
            exp,
        };

        let header = TokenHeader {
            alg: HEADER_ALG.to_string(),
            typ: HEADER_TYP.to_string(),
        };

        let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);
        let signing_input = format!("{}.{}", encoded_header, encoded_payload);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input).finalize().into_bytes());

        Ok(SignedToken {
            token: format!("{}.{}", signing_input, signature),
            payload,
        })
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<SessionTokenPayload, TokenRejected> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token and require a specific type
    pub fn verify_as(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<SessionTokenPayload, TokenRejected> {
        let payload = self.verify(token)?;
        if payload.token_type != expected {
            return Err(TokenRejected::WrongType);
        }
        Ok(payload)
    }

    /// Verify a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionTokenPayload, TokenRejected> {
        let mut parts = token.split('.');
        let (Some(encoded_header), Some(encoded_payload), Some(encoded_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenRejected::Malformed);
        };

        if encoded_header.is_empty() || encoded_payload.is_empty() || encoded_signature.is_empty()
        {
            return Err(TokenRejected::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(encoded_signature)
            .map_err(|_| TokenRejected::BadSignature)?;

        // verify_slice compares in constant time
        let signing_input = format!("{}.{}", encoded_header, encoded_payload);
        self.mac(&signing_input)
            .verify_slice(&signature)
            .map_err(|_| TokenRejected::BadSignature)?;

        let header: TokenHeader = decode_segment(encoded_header).ok_or(TokenRejected::BadHeader)?;
        if header.alg != HEADER_ALG || header.typ != HEADER_TYP {
            return Err(TokenRejected::BadHeader);
        }

        let payload: SessionTokenPayload =
            decode_segment(encoded_payload).ok_or(TokenRejected::BadPayload)?;

        if payload.exp <= now {
            return Err(TokenRejected::Expired);
        }

        Ok(payload)
    }

    fn mac(&self, signing_input: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(signing_input.as_bytes());
        mac
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}
