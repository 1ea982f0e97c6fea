#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::empty_loop)]
#![deny(clippy::indexing_slicing)]
#![deny(unused)]
//! # plant-auth
//!
//! Stateless bearer-token authentication with server-side revocation, for
//! axum and actix-web.
//!
//! The library is built from a few pieces:
//! - [`TokenCodec`]: issues and verifies HS256-signed tokens (10 hour TTL by default).
//! - [`RevocationCache`]: remembers logged-out tokens until they expire on their own.
//! - [`AuthGate`]: the per-request interceptor that turns an `Authorization`
//!   header into a [`GateOutcome`].
//! - [`CredentialStore`]: the account lookups the crate depends on but does not own.
//! - [`AuthService`]: signup, login, profile and logout on top of the above.
//!
//! ## How authentication works
//!
//! 1. Login checks the credentials and returns a signed token.
//! 2. The client sends it back as `Authorization: Bearer <token>`.
//! 3. The gate checks the revocation cache first, then the signature and
//!    expiry, then loads the account's authorities. On success a [`Principal`]
//!    is attached to the request.
//! 4. Logout puts the token in the revocation cache until its natural expiry.
//!    Requests bearing it are rejected from then on.
//!
//! ## 繁體中文
//!
//! 無狀態 bearer token 驗證，並支援伺服器端註銷。
//!
//! 1. 登入時驗證帳密並回傳簽章 token。
//! 2. 客戶端以 `Authorization: Bearer <token>` 送回。
//! 3. Gate 先查註銷快取，再驗證簽章與到期時間，最後載入帳號權限。
//! 4. 登出時將 token 放入註銷快取，直到它原本的到期時間。

mod clock;
mod codec;
mod config;
mod credentials;
mod gate;
mod memory;
mod models;
mod service;

#[cfg(feature = "actix")]
pub mod actix_support;
#[cfg(feature = "axum")]
pub mod axum_support;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::codec::TokenCodec;
pub use crate::config::{
    AuthConfig, DEFAULT_TOKEN_TTL_SECS, MAX_SWEEP_INTERVAL_SECS, MAX_WINDOW_SECS, MIN_SECRET_BYTES,
};
pub use crate::credentials::{CredentialStore, DEFAULT_AUTHORITY, InMemoryCredentialStore};
pub use crate::gate::{AuthGate, GateOutcome, UnauthenticatedReason};
pub use crate::memory::{RevocationCache, RevokeOutcome};
pub use crate::models::{AuthError, Claims, ConfigError, CredentialError, Principal, TokenError};
pub use crate::service::{
    AuthContext, AuthService, LoginRequest, LoginResponse, Profile, SignupRequest,
};

/// Extracts the token from an `Authorization` header value.
///
/// Accepts only `Bearer <token>` where the token is non-empty and contains no
/// whitespace.
///
/// ## 繁體中文
///
/// 從 `Authorization` header 取出 token，只接受 `Bearer <token>` 格式。
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

const TOKEN_HINT_BYTES: usize = 10;

/// Short prefix of a token, safe to put in logs. Never longer than
/// [`TOKEN_HINT_BYTES`]; cut back to the previous char boundary if needed.
pub(crate) fn token_hint(token: &str) -> &str {
    let mut end = TOKEN_HINT_BYTES.min(token.len());
    while !token.is_char_boundary(end) {
        end -= 1;
    }
    token.get(..end).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_accepts_bearer_only() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("Bearer  abc "), Some("abc"));
        assert_eq!(extract_bearer("abc.def.ghi"), None);
        assert_eq!(extract_bearer("bearer abc"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Bearer a b"), None);
        assert_eq!(extract_bearer("Basic dXNlcjpwdw=="), None);
    }

    #[test]
    fn token_hint_is_a_bounded_prefix() {
        assert_eq!(token_hint("abcdefghijklmnop"), "abcdefghij");
        assert_eq!(token_hint("short"), "short");
        assert_eq!(token_hint(""), "");
        assert_eq!(token_hint("ééééééé"), "ééééé");
        // Byte 10 falls inside an `é`: cut before it, never log the whole token.
        assert_eq!(token_hint("aéééééééé"), "aéééé");
    }
}
