//! Data types shared across the crate.
//!
//! This module contains the error types, the signed token claims, and the
//! request-scoped [`Principal`].

mod auth_error;
mod claims;
mod principal;

pub use auth_error::{AuthError, ConfigError, CredentialError, TokenError};
pub use claims::Claims;
pub use principal::Principal;
