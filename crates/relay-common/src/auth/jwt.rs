//! JWT authenticator
//!
//! HS256 tokens via the `jsonwebtoken` crate; the `sub` claim is the principal ID.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use relay_core::PrincipalId;
use serde::{Deserialize, Serialize};

use super::{AuthError, Authenticator, Credentials};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Get the principal this token was issued for
    ///
    /// # Errors
    /// Returns an error if the subject is empty
    pub fn principal(&self) -> Result<PrincipalId, AuthError> {
        PrincipalId::parse(&self.sub).map_err(|_| AuthError::InvalidToken)
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Validates bearer tokens signed with a shared secret
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtAuthenticator {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a principal, valid for `ttl_secs` seconds
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue(&self, principal: &PrincipalId, ttl_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| AuthError::IssueFailed)
    }

    /// Decode and validate a token
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<PrincipalId, AuthError> {
        let token = credentials
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        self.decode_token(token)?.principal()
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new("test-secret-key-that-is-long-enough")
    }

    #[test]
    fn test_issue_and_authenticate() {
        let auth = create_test_authenticator();
        let principal = PrincipalId::from("u1");

        let token = auth.issue(&principal, 900).unwrap();
        let resolved = auth.authenticate(&Credentials::token(token)).unwrap();

        assert_eq!(resolved, principal);
    }

    #[test]
    fn test_expired_token() {
        let auth = create_test_authenticator();
        // Past the default 60s leeway
        let token = auth.issue(&PrincipalId::from("u1"), -600).unwrap();

        assert_eq!(
            auth.authenticate(&Credentials::token(token)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_invalid_token() {
        let auth = create_test_authenticator();
        assert_eq!(
            auth.authenticate(&Credentials::token("invalid.token.here")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let token = create_test_authenticator()
            .issue(&PrincipalId::from("u1"), 900)
            .unwrap();
        let other = JwtAuthenticator::new("another-secret");

        assert_eq!(
            other.authenticate(&Credentials::token(token)),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_missing_token() {
        let auth = create_test_authenticator();
        assert_eq!(
            auth.authenticate(&Credentials::user_id("u1")),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_claims_principal() {
        let claims = Claims {
            sub: "u42".to_string(),
            iat: 0,
            exp: i64::MAX,
        };
        assert_eq!(claims.principal().unwrap().as_str(), "u42");
        assert!(!claims.is_expired());
    }
}
