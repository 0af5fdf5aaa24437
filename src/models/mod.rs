//! Data models for the authentication service

pub mod auth;
pub use auth::*;
