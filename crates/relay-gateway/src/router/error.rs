//! Router error types

use crate::connection::ConnectionError;
use relay_core::PrincipalId;
use thiserror::Error;

/// Router error type
#[derive(Debug, Error)]
pub enum RouterError {
    /// Duplicate login refused while the existing connection is live
    #[error("Principal {0} is already connected")]
    AlreadyConnected(PrincipalId),

    #[error("Principal {0} is not connected")]
    NotConnected(String),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl RouterError {
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected(_))
    }
}

/// Router result type
pub type RouterResult<T> = Result<T, RouterError>;
