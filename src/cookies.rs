//! Session cookie placement

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

use crate::auth::AuthSession;

pub const ACCESS_TOKEN_COOKIE: &str = "tc_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "tc_refresh_token";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_seconds.max(0)))
        .build()
}

fn seconds_until(expires_at: DateTime<Utc>) -> i64 {
    (expires_at - Utc::now()).num_seconds()
}

/// Place both tokens of a session into HttpOnly cookies
pub fn set_session_cookies(jar: CookieJar, session: &AuthSession, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        seconds_until(session.access_token_expires_at),
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        session.refresh_token.clone(),
        seconds_until(session.refresh_token_expires_at),
        secure,
    ))
}

/// Overwrite both cookies with empty, already-expired values
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure))
}

pub fn read_refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
