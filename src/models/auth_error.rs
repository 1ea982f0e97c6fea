//! Error types for plant-auth.
//!
//! Token and credential failures are small enums: the gate
//! collapses all of them into "unauthenticated", so callers mostly match on
//! them in tests and logs. [`AuthError`] is the crate-level error returned by
//! [`crate::AuthService`] and implements the framework response traits when
//! the `axum` or `actix` feature is enabled.
//!
//! ## 繁體中文
//!
//! plant-auth 的錯誤型別。token 與帳號相關錯誤在 gate 中一律視為「未驗證」，
//! [`AuthError`] 則是 [`crate::AuthService`] 回傳的整體錯誤型別。

/// Failures produced by [`crate::TokenCodec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token could not be parsed into header, claims and signature.
    #[error("token is malformed")]
    Malformed,

    /// The MAC did not match the claims under the process signing key.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The signature is valid but `now >= exp`.
    #[error("token has expired")]
    Expired,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Failures reported by a [`crate::CredentialStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The subject no longer exists (e.g. the account was deleted).
    #[error("principal not found")]
    PrincipalNotFound,

    #[error("bad credentials")]
    BadCredentials,

    #[error("account already exists")]
    AlreadyExists,
}

/// Failures while loading [`crate::AuthConfig`] or deriving the signing key.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("signing secret is not valid base64")]
    SecretEncoding,

    #[error("signing secret must decode to at least {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },

    /// A duration setting is zero or larger than the crate accepts.
    #[error("{field} must be between {min} and {max} seconds, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        actual: u64,
    },
}

/// Errors returned by plant-auth.
///
/// ## 繁體中文
///
/// plant-auth 會回傳的錯誤集合。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The `Authorization` header is absent or does not carry a bearer token.
    #[error("authorization header must be `Bearer <token>`")]
    InvalidBearer,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthError {
    /// HTTP status code for this error, shared by the axum and actix adapters.
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::Token(_) => 401,
            AuthError::Credential(CredentialError::AlreadyExists) => 409,
            AuthError::Credential(_) => 401,
            AuthError::InvalidBearer => 400,
            AuthError::Config(_) => 500,
        }
    }
}
