//! WebSocket close codes
//!
//! Gateway-specific close codes sent in the close frame.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// No liveness response within the timeout window
    HeartbeatTimeout = 4001,
    /// Same principal connected again and this connection was evicted
    Replaced = 4002,
    /// Same principal is already connected and duplicates are refused
    Rejected = 4003,
    /// Client violated the protocol (e.g. binary frames)
    PolicyViolation = 4004,
    /// Closed by an administrator
    Kicked = 4005,
    /// Server is shutting down
    Shutdown = 4006,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::HeartbeatTimeout),
            4002 => Some(Self::Replaced),
            4003 => Some(Self::Rejected),
            4004 => Some(Self::PolicyViolation),
            4005 => Some(Self::Kicked),
            4006 => Some(Self::Shutdown),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(
            self,
            Self::UnknownError | Self::HeartbeatTimeout | Self::Shutdown
        )
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::HeartbeatTimeout => "Heartbeat timeout",
            Self::Replaced => "Replaced by a newer connection",
            Self::Rejected => "Already connected",
            Self::PolicyViolation => "Protocol violation",
            Self::Kicked => "Closed by administrator",
            Self::Shutdown => "Server shutting down",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::HeartbeatTimeout => "HeartbeatTimeout",
            Self::Replaced => "Replaced",
            Self::Rejected => "Rejected",
            Self::PolicyViolation => "PolicyViolation",
            Self::Kicked => "Kicked",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
