//! Login, signup, profile and logout.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::codec::TokenCodec;
use crate::config::AuthConfig;
use crate::credentials::CredentialStore;
use crate::gate::AuthGate;
use crate::memory::{RevocationCache, RevokeOutcome};
use crate::{AuthError, ConfigError, Principal, extract_bearer, token_hint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub authorities: Vec<String>,
}

/// The account-facing operations. Logout is the only producer of revocation
/// entries.
#[derive(Clone)]
pub struct AuthService {
    codec: Arc<TokenCodec>,
    revocations: Arc<RevocationCache>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthService {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<RevocationCache>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            codec,
            revocations,
            credentials,
        }
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<(), AuthError> {
        debug!(email = %request.email, "signup requested");
        self.credentials
            .register(&request.email, &request.password)
            .await?;
        info!(email = %request.email, "account created");
        Ok(())
    }

    /// Checks the credentials and issues a token for the account.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!(email = %request.email, "login requested");
        let subject = self
            .credentials
            .verify_credentials(&request.email, &request.password)
            .await?;
        let token = self.codec.issue(&subject)?;
        info!(subject = %subject, "login succeeded");
        Ok(LoginResponse { token })
    }

    pub fn profile(&self, principal: &Principal) -> Profile {
        Profile {
            email: principal.subject.clone(),
            authorities: principal.authorities.clone(),
        }
    }

    /// Revokes the bearer token in `authorization` (the raw header value).
    ///
    /// Only a missing or non-`Bearer` header is refused. A garbled token is
    /// still revoked, for the fallback window.
    pub fn logout(&self, authorization: Option<&str>) -> Result<RevokeOutcome, AuthError> {
        let token = authorization
            .and_then(extract_bearer)
            .ok_or(AuthError::InvalidBearer)?;
        let outcome = self.revocations.revoke(token);
        info!(token = token_hint(token), ?outcome, "logout");
        Ok(outcome)
    }
}

/// Everything a server needs, built once at start-up from [`AuthConfig`].
#[derive(Clone)]
pub struct AuthContext {
    pub gate: AuthGate,
    pub service: AuthService,
    pub revocations: Arc<RevocationCache>,
}

impl AuthContext {
    pub fn from_config(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let codec = Arc::new(TokenCodec::from_config(config, clock.clone())?);
        let revocations = Arc::new(RevocationCache::new(
            codec.clone(),
            clock,
            config.revocation_fallback(),
        ));
        let gate = AuthGate::new(
            codec.clone(),
            revocations.clone(),
            credentials.clone(),
            config.exempt_paths.iter().cloned(),
        );
        let service = AuthService::new(codec, revocations.clone(), credentials);
        Ok(Self {
            gate,
            service,
            revocations,
        })
    }
}
