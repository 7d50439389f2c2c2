//! Pub/Sub channel definitions.
//!
//! Topic names are `{prefix}:user:{id}`, `{prefix}:room:{name}` and
//! `{prefix}:broadcast`.

use relay_core::{Message, MessageTarget, PrincipalId};

/// Channel prefix for direct messages
pub const USER_CHANNEL_PREFIX: &str = "user:";
/// Channel prefix for room-scoped messages
pub const ROOM_CHANNEL_PREFIX: &str = "room:";
/// Channel for broadcast messages
pub const BROADCAST_CHANNEL: &str = "broadcast";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Messages addressed to one principal
    User(PrincipalId),
    /// Messages addressed to a room
    Room(String),
    /// Messages addressed to everyone
    Broadcast,
}

impl PubSubChannel {
    #[must_use]
    pub fn user(principal: PrincipalId) -> Self {
        Self::User(principal)
    }

    #[must_use]
    pub fn room(name: impl Into<String>) -> Self {
        Self::Room(name.into())
    }

    #[must_use]
    pub fn broadcast() -> Self {
        Self::Broadcast
    }

    /// Channel matching where a message is addressed
    #[must_use]
    pub fn for_message(message: &Message) -> Self {
        match message.target() {
            MessageTarget::Direct(receiver) => Self::User(receiver.clone()),
            MessageTarget::Room(room) => Self::Room(room.to_string()),
            MessageTarget::Broadcast => Self::Broadcast,
        }
    }

    /// Channel name without the deployment prefix
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::User(id) => format!("{USER_CHANNEL_PREFIX}{id}"),
            Self::Room(name) => format!("{ROOM_CHANNEL_PREFIX}{name}"),
            Self::Broadcast => BROADCAST_CHANNEL.to_string(),
        }
    }

    /// Full Redis topic under a deployment prefix
    #[must_use]
    pub fn topic(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.name()
        } else {
            format!("{prefix}:{}", self.name())
        }
    }

    /// Parse a topic back to a channel, given the deployment prefix
    #[must_use]
    pub fn parse(prefix: &str, topic: &str) -> Option<Self> {
        let name = if prefix.is_empty() {
            topic
        } else {
            topic.strip_prefix(prefix)?.strip_prefix(':')?
        };

        if name == BROADCAST_CHANNEL {
            return Some(Self::Broadcast);
        }
        if let Some(id) = name.strip_prefix(USER_CHANNEL_PREFIX) {
            return PrincipalId::parse(id).ok().map(Self::User);
        }
        name.strip_prefix(ROOM_CHANNEL_PREFIX)
            .filter(|room| !room.is_empty())
            .map(Self::room)
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
