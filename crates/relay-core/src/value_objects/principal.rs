//! Principal ID - stable identity of a connected client
//!
//! Unique among simultaneously online connections. The routing core never
//! interprets the contents; whatever the authenticator resolves is used as-is.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identity of an authenticated client
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Create a new principal ID
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a principal ID, rejecting empty or whitespace-only input
    pub fn parse(s: &str) -> Result<Self, PrincipalParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PrincipalParseError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the inner string
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Check if the ID is empty (never valid for a registered connection)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Error when parsing a principal ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalParseError {
    #[error("principal id must not be empty")]
    Empty,
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<PrincipalId> for String {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PrincipalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = PrincipalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrincipalId::parse(s)
    }
}
