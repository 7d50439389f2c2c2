//! Trusted authenticator for development and tests
//!
//! Accepts whatever principal the client declares.

use relay_core::PrincipalId;

use super::{AuthError, Authenticator, Credentials};

#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedAuthenticator;

impl Authenticator for TrustedAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<PrincipalId, AuthError> {
        credentials
            .user_id
            .as_deref()
            .ok_or(AuthError::MissingCredentials)
            .and_then(|id| PrincipalId::parse(id).map_err(|_| AuthError::MissingCredentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_declared_user() {
        let principal = TrustedAuthenticator
            .authenticate(&Credentials::user_id(" u1 "))
            .unwrap();
        assert_eq!(principal.as_str(), "u1");
    }

    #[test]
    fn test_rejects_missing_or_empty_user() {
        assert_eq!(
            TrustedAuthenticator.authenticate(&Credentials::default()),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            TrustedAuthenticator.authenticate(&Credentials::user_id("")),
            Err(AuthError::MissingCredentials)
        );
    }
}
