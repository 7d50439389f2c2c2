//! Message entity - one decoded unit exchanged between clients
//!
//! The same shape is used on the wire (JSON text frames), in the archive and
//! in the offline queue. Optional string fields treat `""` as absent so that
//! clients which always send every key behave like clients which omit them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;
use crate::value_objects::PrincipalId;

/// Reserved event type carrying an acknowledgment for an earlier frame
pub const ACK_EVENT: &str = "__ack__";

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event type, drives handler dispatch (required, non-empty)
    #[serde(default)]
    pub event: String,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Whether the sender asks for an acknowledgment
    #[serde(default, skip_serializing_if = "is_false")]
    pub ack: bool,

    /// Correlation ID for the acknowledgment
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<PrincipalId>,

    /// Direct recipient
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<PrincipalId>,

    /// Room for room-scoped events
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// Opaque application payload
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Where a message is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget<'a> {
    Direct(&'a PrincipalId),
    Room(&'a str),
    Broadcast,
}

impl Message {
    /// Create a new message with the given event type and payload
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            namespace: None,
            ack: false,
            ack_id: None,
            sender_id: None,
            receiver_id: None,
            room_id: None,
            data,
        }
    }

    /// Create an acknowledgment frame for the given correlation ID
    pub fn ack_frame(ack_id: impl Into<String>) -> Self {
        Self::new(ACK_EVENT, serde_json::Value::Null).with_ack_id(ack_id)
    }

    /// Set the sender
    #[must_use]
    pub fn with_sender(mut self, sender: PrincipalId) -> Self {
        self.sender_id = Some(sender);
        self
    }

    /// Set the direct recipient
    #[must_use]
    pub fn with_receiver(mut self, receiver: PrincipalId) -> Self {
        self.receiver_id = Some(receiver);
        self
    }

    /// Set the room
    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room_id = Some(room.into());
        self
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the correlation ID without requesting an acknowledgment
    #[must_use]
    pub fn with_ack_id(mut self, ack_id: impl Into<String>) -> Self {
        self.ack_id = Some(ack_id.into());
        self
    }

    /// Request an acknowledgment under the given correlation ID
    #[must_use]
    pub fn requesting_ack(mut self, ack_id: impl Into<String>) -> Self {
        self.ack = true;
        self.ack_id = Some(ack_id.into());
        self
    }

    /// Check the invariants every decoded message must satisfy
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.event.trim().is_empty() {
            return Err(DomainError::MissingEvent);
        }
        Ok(())
    }

    /// Check if this is an acknowledgment frame with a usable correlation ID
    #[inline]
    pub fn is_ack(&self) -> bool {
        self.event == ACK_EVENT && self.ack_id.is_some()
    }

    /// Check if the sender asked for an acknowledgment it can correlate
    #[inline]
    pub fn wants_ack(&self) -> bool {
        self.ack && self.ack_id.is_some()
    }

    /// Resolve where this message is addressed; a receiver wins over a room
    pub fn target(&self) -> MessageTarget<'_> {
        match (&self.receiver_id, &self.room_id) {
            (Some(receiver), _) => MessageTarget::Direct(receiver),
            (None, Some(room)) => MessageTarget::Room(room),
            (None, None) => MessageTarget::Broadcast,
        }
    }
}

/// Query over archived messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub sender_id: Option<PrincipalId>,
    pub receiver_id: Option<PrincipalId>,
    pub room_id: Option<String>,
    pub event: Option<String>,
    pub limit: i64,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            sender_id: None,
            receiver_id: None,
            room_id: None,
            event: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl MessageFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    #[must_use]
    pub fn sender(mut self, sender: PrincipalId) -> Self {
        self.sender_id = Some(sender);
        self
    }

    #[must_use]
    pub fn receiver(mut self, receiver: PrincipalId) -> Self {
        self.receiver_id = Some(receiver);
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room_id = Some(room.into());
        self
    }

    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Limit clamped to `1..=MAX_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Check whether a message satisfies every set criterion
    pub fn matches(&self, message: &Message) -> bool {
        fn check<T: PartialEq + ?Sized>(want: Option<&T>, have: Option<&T>) -> bool {
            want.map_or(true, |w| have == Some(w))
        }

        check(self.sender_id.as_ref(), message.sender_id.as_ref())
            && check(self.receiver_id.as_ref(), message.receiver_id.as_ref())
            && check(self.room_id.as_deref(), message.room_id.as_deref())
            && check(self.event.as_deref(), Some(message.event.as_str()))
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(T::from))
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_frame() {
        let msg: Message = serde_json::from_str(r#"{"event":"chat","data":"hi"}"#).unwrap();
        assert_eq!(msg.event, "chat");
        assert_eq!(msg.data, json!("hi"));
        assert!(!msg.ack);
        assert!(msg.receiver_id.is_none());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let msg: Message = serde_json::from_str(
            r#"{"event":"chat","receiver_id":"","ack_id":"","room_id":"","data":null}"#,
        )
        .unwrap();
        assert!(msg.receiver_id.is_none());
        assert!(msg.ack_id.is_none());
        assert!(msg.room_id.is_none());
        assert_eq!(msg.target(), MessageTarget::Broadcast);
    }

    #[test]
    fn test_missing_event_fails_validation() {
        let msg: Message = serde_json::from_str(r#"{"data":1}"#).unwrap();
        assert!(matches!(msg.validate(), Err(DomainError::MissingEvent)));

        let blank = Message::new("  ", json!(null));
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_ack_frame() {
        let ack = Message::ack_frame("X");
        assert!(ack.is_ack());
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({"event": "__ack__", "ack_id": "X", "data": null})
        );

        let no_id: Message = serde_json::from_str(r#"{"event":"__ack__"}"#).unwrap();
        assert!(!no_id.is_ack());
    }

    #[test]
    fn test_target_prefers_receiver() {
        let msg = Message::new("chat", json!({}))
            .with_room("lobby")
            .with_receiver(PrincipalId::from("u2"));
        assert_eq!(msg.target(), MessageTarget::Direct(&PrincipalId::from("u2")));

        let room = Message::new("chat", json!({})).with_room("lobby");
        assert_eq!(room.target(), MessageTarget::Room("lobby"));
    }

    #[test]
    fn test_wants_ack_needs_correlation_id() {
        let mut msg = Message::new("chat", json!({}));
        msg.ack = true;
        assert!(!msg.wants_ack());
        assert!(msg.requesting_ack("a1").wants_ack());
    }

    #[test]
    fn test_filter_matches() {
        let msg = Message::new("chat", json!("hi"))
            .with_sender(PrincipalId::from("u1"))
            .with_receiver(PrincipalId::from("u2"));

        assert!(MessageFilter::default().matches(&msg));
        assert!(MessageFilter::default().sender(PrincipalId::from("u1")).matches(&msg));
        assert!(!MessageFilter::default().receiver(PrincipalId::from("u1")).matches(&msg));
        assert!(!MessageFilter::default().room("lobby").matches(&msg));
        assert!(MessageFilter::default().event("chat").matches(&msg));
    }

    #[test]
    fn test_filter_limit_is_clamped() {
        assert_eq!(MessageFilter::default().limit(0).effective_limit(), 1);
        assert_eq!(MessageFilter::default().limit(10_000).effective_limit(), 500);
        assert_eq!(MessageFilter::default().effective_limit(), 50);
    }
}
