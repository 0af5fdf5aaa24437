//! Digest and randomness helpers shared by the auth components

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes behind a login nonce (256 bits)
pub const NONCE_BYTES: usize = 32;

/// Random bytes behind a token id (192 bits)
pub const TOKEN_ID_BYTES: usize = 24;

/// Hex-encoded SHA-256 of a string.
///
/// Nonces and refresh tokens are only ever persisted through this digest.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// `bytes` of OS randomness, base64url without padding
pub fn random_url_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn random_nonce() -> String {
    random_url_token(NONCE_BYTES)
}

pub fn random_token_id() -> String {
    random_url_token(TOKEN_ID_BYTES)
}
