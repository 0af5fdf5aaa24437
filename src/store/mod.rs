//! Durable state for login challenges and refresh tokens
//!
//! Both stores are traits so the session layer can run against Postgres in
//! production and against [`MemoryAuthStore`] in tests. Atomicity lives in
//! the store: a nonce is consumed by one conditional update.

mod memory;
mod nonce;
mod refresh_token;

use thiserror::Error;

pub use memory::MemoryAuthStore;
pub use nonce::{IssuedNonce, NonceStore, PgNonceStore};
pub use refresh_token::{PgRefreshTokenStore, RefreshTokenStore};

/// Store failures; always fatal for the current request
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Expiry {0}s from now is out of range")]
    ExpiryOutOfRange(i64),
}
