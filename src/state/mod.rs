//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::SessionManager;
use crate::config::Environment;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    pub environment: Environment,
    /// Absent when running against in-memory stores
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        session_manager: Arc<SessionManager>,
        environment: Environment,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            session_manager,
            environment,
            db_pool,
        }
    }

    /// Session cookies are marked Secure in production
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.session_manager.clone()
    }
}
