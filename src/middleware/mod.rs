//! Middleware for the auth API
//!
//! Request tracing, security headers, and access token authentication.

pub mod auth;
mod security;
mod tracing;

pub use auth::{authenticate, read_access_token, AuthenticatedWallet, Unauthorized};
pub use security::{hsts_header, security_headers};
pub use tracing::{client_ip, request_tracing, REQUEST_ID_HEADER};
