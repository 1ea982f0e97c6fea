//! Per-request authentication.
//!
//! [`AuthGate::authenticate`] runs before any business logic and decides, for
//! one request, which of four things happens:
//!
//! 1. exempt path → [`GateOutcome::Bypassed`]
//! 2. no usable bearer token → [`GateOutcome::Unauthenticated`]
//! 3. token revoked → [`GateOutcome::Rejected`]
//! 4. token verifies and the account exists → [`GateOutcome::Authenticated`],
//!    otherwise [`GateOutcome::Unauthenticated`]
//!
//! The revocation lookup comes before signature verification, so a revoked
//! token is refused even while it still verifies.
//!
//! Only [`GateOutcome::Rejected`] stops the request here. Everything else
//! proceeds, and handlers decide whether they need a [`Principal`].
//!
//! ## 繁體中文
//!
//! 每個請求的驗證流程。先查註銷快取再驗簽章；只有被註銷的 token 會在此被拒絕，
//! 其餘情況交由後續 handler 判斷是否需要身分。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::TokenCodec;
use crate::credentials::CredentialStore;
use crate::memory::RevocationCache;
use crate::{Principal, TokenError, extract_bearer, token_hint};

/// Why a request carries no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No `Authorization: Bearer <token>` header.
    MissingToken,
    /// The token is malformed, badly signed or expired.
    InvalidToken(TokenError),
    /// The token is valid but its subject no longer exists.
    UnknownPrincipal,
}

/// Terminal state of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The path is exempt; no authentication was attempted.
    Bypassed,
    /// The request proceeds without identity.
    Unauthenticated(UnauthenticatedReason),
    /// The token was revoked. The request must be terminated.
    Rejected,
    /// The request proceeds with this identity.
    Authenticated(Principal),
}

impl GateOutcome {
    /// The established identity, if any.
    ///
    /// ## 繁體中文
    ///
    /// 驗證成功時回傳身分，否則為 `None`。
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            GateOutcome::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    /// Owned variant of [`principal`](Self::principal).
    pub fn into_principal(self) -> Option<Principal> {
        match self {
            GateOutcome::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

/// The request interceptor. Cheap to clone; every clone shares the same
/// codec, cache and store.
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    revocations: Arc<RevocationCache>,
    credentials: Arc<dyn CredentialStore>,
    exempt_paths: Arc<[String]>,
}

impl AuthGate {
    pub fn new<I, S>(
        codec: Arc<TokenCodec>,
        revocations: Arc<RevocationCache>,
        credentials: Arc<dyn CredentialStore>,
        exempt_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codec,
            revocations,
            credentials,
            exempt_paths: exempt_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` skips authentication. Exact match only.
    ///
    /// ## 繁體中文
    ///
    /// `path` 是否免驗證（僅完全比對）。
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// The revocation cache this gate consults.
    pub fn revocations(&self) -> &Arc<RevocationCache> {
        &self.revocations
    }

    /// Runs the gate for a request to `path` carrying `authorization` (the raw
    /// `Authorization` header value, if any).
    pub async fn authenticate(&self, path: &str, authorization: Option<&str>) -> GateOutcome {
        if self.is_exempt(path) {
            return GateOutcome::Bypassed;
        }

        let Some(token) = authorization.and_then(extract_bearer) else {
            return GateOutcome::Unauthenticated(UnauthenticatedReason::MissingToken);
        };

        if self.revocations.is_revoked(token) {
            warn!(path, token = token_hint(token), "blocked access: token is revoked");
            return GateOutcome::Rejected;
        }

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(path, error = %err, "token not accepted");
                return GateOutcome::Unauthenticated(UnauthenticatedReason::InvalidToken(err));
            }
        };

        match self.credentials.load_principal(&claims.sub).await {
            Ok(authorities) => {
                debug!(path, subject = %claims.sub, "request authenticated");
                GateOutcome::Authenticated(Principal::new(claims.sub, authorities))
            }
            Err(err) => {
                debug!(path, subject = %claims.sub, error = %err, "token subject not loadable");
                GateOutcome::Unauthenticated(UnauthenticatedReason::UnknownPrincipal)
            }
        }
    }
}
