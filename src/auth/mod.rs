//! Wallet authentication
//!
//! Provides passwordless authentication using Stellar account keys.
//! - Strkey address decoding and ed25519 signature verification
//! - Challenge-response login with single-use nonces
//! - Signed access/refresh tokens with refresh rotation

pub mod crypto;
pub mod signature;
pub mod strkey;
pub mod token;

mod session;

pub use session::{
    build_auth_message, AuthContext, AuthError, AuthSession, Challenge, LoginRequest,
    SessionManager, AUTH_MESSAGE_TITLE,
};
pub use strkey::{AddressError, RawPublicKey};
pub use token::{SessionTokenPayload, SigningSecret, TokenCodec, TokenRejected, TokenType};
