//! Authentication HTTP handlers
//!
//! Challenge issuing, login, rotation, logout, and the current-wallet probe.
//! Tokens travel only in HttpOnly cookies; response bodies carry expiries.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::auth::{AuthSession, LoginRequest};
use crate::cookies::{clear_session_cookies, read_refresh_token, set_session_cookies};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{client_ip, AuthenticatedWallet};
use crate::models::{
    ClientContext, CurrentWalletResponse, LogoutResponse, NonceRequest, NonceResponse,
    RefreshTokenRequest, SessionResponse, VerifyRequest,
};
use crate::state::AppState;

fn client_context(headers: &HeaderMap) -> ClientContext {
    ClientContext {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip_address: client_ip(headers),
    }
}

fn session_response(session: &AuthSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        wallet_address: session.wallet_address.clone(),
        access_token_expires_at: session.access_token_expires_at,
        refresh_token_expires_at: session.refresh_token_expires_at,
    })
}

/// Cookie first, then the optional JSON body
fn refresh_token_from(jar: &CookieJar, body: Option<Json<RefreshTokenRequest>>) -> Option<String> {
    read_refresh_token(jar).or_else(|| {
        body.and_then(|Json(req)| req.refresh_token)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// POST /api/auth/nonce - Issue a login challenge
pub async fn request_nonce(
    State(state): State<AppState>,
    payload: Result<Json<NonceRequest>, JsonRejection>,
) -> ApiResult<Json<NonceResponse>> {
    let Ok(Json(req)) = payload else {
        return Err(ApiError::InvalidWalletAddress);
    };
    if req.validate().is_err() {
        return Err(ApiError::InvalidWalletAddress);
    }
    let wallet_address = req.wallet_address.unwrap_or_default();

    let challenge = state
        .session_manager
        .issue_challenge(&wallet_address)
        .await
        .map_err(|e| ApiError::from_auth(e, "NONCE_ISSUE_FAILED", "Failed to issue nonce"))?;

    Ok(Json(NonceResponse {
        wallet_address: challenge.wallet_address,
        nonce: challenge.nonce,
        message: challenge.message,
        expires_at: challenge.expires_at,
    }))
}

/// POST /api/auth/verify - Verify a signed challenge and open a session
pub async fn verify_signature(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let Json(req) = payload.map_err(|_| ApiError::InvalidAuthPayload)?;
    req.validate()?;

    let request = LoginRequest {
        wallet_address: req.wallet_address.unwrap_or_default(),
        nonce: req.nonce.unwrap_or_default(),
        signature: req.signature.unwrap_or_default(),
        message: req.message,
    };

    let session = state
        .session_manager
        .login(request, client_context(&headers))
        .await
        .map_err(|e| {
            ApiError::from_auth(e, "AUTH_VERIFICATION_FAILED", "Failed to verify signature")
        })?;

    let jar = set_session_cookies(jar, &session, state.secure_cookies());
    Ok((jar, session_response(&session)))
}

/// POST /api/auth/refresh - Rotate the refresh token and issue a new pair
pub async fn refresh_session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<(CookieJar, Json<SessionResponse>), (CookieJar, ApiError)> {
    let secure = state.secure_cookies();

    let Some(refresh_token) = refresh_token_from(&jar, body) else {
        return Err((jar, ApiError::RefreshTokenRequired));
    };

    let rotated = state
        .session_manager
        .rotate_session(&refresh_token, &client_context(&headers))
        .await;

    match rotated {
        Ok(Some(session)) => {
            let jar = set_session_cookies(jar, &session, secure);
            Ok((jar, session_response(&session)))
        }
        Ok(None) => Err((
            clear_session_cookies(jar, secure),
            ApiError::InvalidRefreshToken,
        )),
        Err(e) => Err((
            jar,
            ApiError::internal("SESSION_REFRESH_FAILED", "Failed to refresh session", e),
        )),
    }
}

/// POST /api/auth/logout - Revoke the refresh token and clear cookies
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> ApiResult<(CookieJar, Json<LogoutResponse>)> {
    if let Some(refresh_token) = refresh_token_from(&jar, body) {
        state
            .session_manager
            .revoke_session(&refresh_token)
            .await
            .map_err(|e| ApiError::internal("LOGOUT_FAILED", "Failed to log out", e))?;
    }

    let jar = clear_session_cookies(jar, state.secure_cookies());
    Ok((jar, Json(LogoutResponse { ok: true })))
}

/// GET /api/auth/me - Current authenticated wallet
pub async fn current_wallet(wallet: AuthenticatedWallet) -> Json<CurrentWalletResponse> {
    Json(CurrentWalletResponse {
        wallet_address: wallet.wallet_address,
        authenticated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_context() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("freighter/5.0"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));

        let context = client_context(&headers);
        assert_eq!(context.user_agent.as_deref(), Some("freighter/5.0"));
        assert_eq!(context.ip_address.as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_refresh_token_prefers_cookie() {
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            crate::cookies::REFRESH_TOKEN_COOKIE,
            "from-cookie",
        ));
        let body = Some(Json(RefreshTokenRequest {
            refresh_token: Some("from-body".to_string()),
        }));

        assert_eq!(
            refresh_token_from(&jar, body).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_refresh_token_body_fallback() {
        let body = Some(Json(RefreshTokenRequest {
            refresh_token: Some("  from-body ".to_string()),
        }));

        assert_eq!(
            refresh_token_from(&CookieJar::new(), body).as_deref(),
            Some("from-body")
        );
        assert_eq!(refresh_token_from(&CookieJar::new(), None), None);
    }
}
