//! TaskChain wallet authentication
//!
//! Stellar wallet login by signed challenge, with short-lived access tokens
//! and rotating refresh tokens delivered as HttpOnly cookies.

pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
