//! Handler error types

use crate::room::RoomError;
use thiserror::Error;

/// Handler error type
///
/// Reported back to the sender as an `error` frame; never closes the
/// connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame is well-formed but lacks what this event needs
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Room(#[from] RoomError),
}

impl HandlerError {
    /// Error code carried in the error frame
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::Room(e) => e.code(),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
