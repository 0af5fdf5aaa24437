//! API handlers

pub mod auth;
pub mod health;

pub use auth::{current_wallet, logout, refresh_session, request_nonce, verify_signature};
pub use health::health_check;
