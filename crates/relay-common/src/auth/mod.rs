//! Authentication - resolve connection credentials to a principal
//!
//! The gateway only needs "given credentials, produce a principal or fail";
//! how tokens are issued is someone else's concern.

mod jwt;
mod trusted;

use relay_core::PrincipalId;

pub use jwt::{Claims, JwtAuthenticator};
pub use trusted::TrustedAuthenticator;

/// Credentials presented when a connection is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token (JWT mode)
    pub token: Option<String>,
    /// Declared principal (trusted mode)
    pub user_id: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user_id: None,
        }
    }

    #[must_use]
    pub fn user_id(user_id: impl Into<String>) -> Self {
        Self {
            token: None,
            user_id: Some(user_id.into()),
        }
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Failed to issue token")]
    IssueFailed,
}

/// Capability that turns credentials into a principal identity
pub trait Authenticator: Send + Sync {
    /// Resolve credentials to a principal
    ///
    /// # Errors
    /// Returns an error if the credentials are absent or not acceptable
    fn authenticate(&self, credentials: &Credentials) -> Result<PrincipalId, AuthError>;
}
