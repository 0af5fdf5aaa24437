//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes under `/api/auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/nonce", post(auth::request_nonce))
        .route("/api/auth/verify", post(auth::verify_signature))
        .route("/api/auth/refresh", post(auth::refresh_session))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::current_wallet))
}
