//! Authentication middleware
//!
//! Extracts the access token from the request and exposes the authenticated
//! wallet to handlers. Every failure produces the same 401 so callers cannot
//! tell a missing token from an expired or forged one.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;

use crate::auth::{AuthContext, SessionManager, TokenCodec, TokenType};
use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::error::ApiError;

/// Uniform authentication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        ApiError::Unauthorized.into_response()
    }
}

/// Access token from `Authorization: Bearer`, falling back to the cookie
pub fn read_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        let token = bearer.token().trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Authenticate a request from its headers
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<AuthContext, Unauthorized> {
    let token = read_access_token(headers).ok_or(Unauthorized)?;

    let payload = codec.verify_as(&token, TokenType::Access).map_err(|reason| {
        tracing::debug!(%reason, "Access token rejected");
        Unauthorized
    })?;

    Ok(AuthContext {
        wallet_address: payload.wallet,
        jti: payload.jti,
    })
}

/// Extractor for authenticated wallets
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(wallet: AuthenticatedWallet) -> impl IntoResponse {
///     format!("Hello, {}", wallet.wallet_address)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedWallet {
    pub wallet_address: String,
    pub jti: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedWallet
where
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session_manager = Arc::<SessionManager>::from_ref(state);
        let context = authenticate(&parts.headers, session_manager.token_codec())?;

        Ok(AuthenticatedWallet {
            wallet_address: context.wallet_address,
            jti: context.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SigningSecret;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use axum::http::HeaderValue;

    const WALLET: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    fn codec() -> TokenCodec {
        TokenCodec::new(SigningSecret::new(vec![5u8; 32]).unwrap())
    }

    fn headers(pairs: &[(axum::http::HeaderName, String)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_header() {
        let codec = codec();
        let signed = codec.sign(WALLET, WALLET, TokenType::Access, 900).unwrap();
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", signed.token))]);

        let context = authenticate(&headers, &codec).unwrap();
        assert_eq!(context.wallet_address, WALLET);
        assert_eq!(context.jti, signed.payload.jti);
    }

    #[test]
    fn test_cookie_fallback() {
        let codec = codec();
        let signed = codec.sign(WALLET, WALLET, TokenType::Access, 900).unwrap();
        let headers = headers(&[(
            COOKIE,
            format!("theme=dark; {}={}", ACCESS_TOKEN_COOKIE, signed.token),
        )]);

        assert!(authenticate(&headers, &codec).is_ok());
    }

    #[test]
    fn test_header_takes_precedence() {
        let codec = codec();
        let signed = codec.sign(WALLET, WALLET, TokenType::Access, 900).unwrap();
        let headers = headers(&[
            (AUTHORIZATION, "Bearer not-a-token".to_string()),
            (COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, signed.token)),
        ]);

        assert_eq!(read_access_token(&headers).as_deref(), Some("not-a-token"));
        assert_eq!(authenticate(&headers, &codec), Err(Unauthorized));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(
            authenticate(&HeaderMap::new(), &codec()),
            Err(Unauthorized)
        );
    }

    #[test]
    fn test_refresh_token_rejected() {
        let codec = codec();
        let signed = codec.sign(WALLET, WALLET, TokenType::Refresh, 900).unwrap();
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", signed.token))]);

        assert_eq!(authenticate(&headers, &codec), Err(Unauthorized));
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let signed = codec
            .sign_at(WALLET, WALLET, TokenType::Access, 900, 1_000)
            .unwrap();
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", signed.token))]);

        assert_eq!(authenticate(&headers, &codec), Err(Unauthorized));
    }
}
