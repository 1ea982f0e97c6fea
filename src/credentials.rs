//! The account side of authentication.
//!
//! Password storage and hashing live outside this crate; the gate and the
//! login flow only go through [`CredentialStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::CredentialError;

/// Authority granted to every self-registered account.
pub const DEFAULT_AUTHORITY: &str = "ROLE_USER";

/// Account lookups used by login and by [`crate::AuthGate`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Checks an email/password pair and returns the subject to put in the
    /// token.
    async fn verify_credentials(&self, email: &str, password: &str)
    -> Result<String, CredentialError>;

    /// Current authorities of `subject`. Fails with
    /// [`CredentialError::PrincipalNotFound`] if the account is gone.
    async fn load_principal(&self, subject: &str) -> Result<Vec<String>, CredentialError>;

    /// Creates an account. Fails with [`CredentialError::AlreadyExists`] if
    /// the email is taken.
    async fn register(&self, email: &str, password: &str) -> Result<(), CredentialError>;
}

struct Account {
    password: String,
    authorities: Vec<String>,
}

/// Map-backed store for development and tests.
///
/// Passwords are compared as plain strings. Do not use this with real
/// accounts.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with [`DEFAULT_AUTHORITY`].
    pub fn register(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        self.register_with_authorities(email, password, vec![DEFAULT_AUTHORITY.to_string()])
    }

    pub fn register_with_authorities(
        &self,
        email: &str,
        password: &str,
        authorities: Vec<String>,
    ) -> Result<(), CredentialError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(email) {
            return Err(CredentialError::AlreadyExists);
        }
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                authorities,
            },
        );
        Ok(())
    }

    /// Deletes an account. Tokens already issued to it stop authenticating on
    /// their next request.
    pub fn remove(&self, email: &str) -> bool {
        self.accounts.write().remove(email).is_some()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, CredentialError> {
        match self.accounts.read().get(email) {
            Some(account) if account.password == password => Ok(email.to_string()),
            _ => Err(CredentialError::BadCredentials),
        }
    }

    async fn load_principal(&self, subject: &str) -> Result<Vec<String>, CredentialError> {
        self.accounts
            .read()
            .get(subject)
            .map(|account| account.authorities.clone())
            .ok_or(CredentialError::PrincipalNotFound)
    }

    async fn register(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        InMemoryCredentialStore::register(self, email, password)
    }
}
