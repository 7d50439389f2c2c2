//! Gateway protocol definitions
//!
//! JSON text frames and WebSocket close codes.

mod close_codes;
mod codec;

pub use close_codes::CloseCode;
pub use codec::{decode, encode, error_frame, DecodeError, ERROR_EVENT};
