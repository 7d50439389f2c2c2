//! Frame codec
//!
//! One WebSocket text frame carries one JSON-encoded `Message`.

use relay_core::Message;
use serde_json::json;
use thiserror::Error;

/// Event type of server-generated error frames
pub const ERROR_EVENT: &str = "error";

/// Frame decode errors; the frame is dropped, the connection stays open
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Frame is missing an event type")]
    MissingEvent,
}

/// Decode a text frame into a message
pub fn decode(text: &str) -> Result<Message, DecodeError> {
    let message: Message = serde_json::from_str(text)?;
    message.validate().map_err(|_| DecodeError::MissingEvent)?;
    Ok(message)
}

/// Encode a message into a text frame
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Build an error frame answering a client's request
pub fn error_frame(code: &str, message: impl Into<String>, event: Option<&str>) -> Message {
    let mut data = json!({ "code": code, "message": message.into() });
    if let Some(event) = event {
        data["event"] = json!(event);
    }
    Message::new(ERROR_EVENT, data)
}
