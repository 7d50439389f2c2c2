//! Message database model

use chrono::{DateTime, Utc};
use relay_core::{Message, PrincipalId};
use sqlx::FromRow;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub event: String,
    pub namespace: Option<String>,
    pub ack_id: Option<String>,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub room_id: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Convert MessageModel to Message entity
impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Message {
            event: model.event,
            namespace: model.namespace,
            ack: false,
            ack_id: model.ack_id,
            sender_id: model.sender_id.map(PrincipalId::new),
            receiver_id: model.receiver_id.map(PrincipalId::new),
            room_id: model.room_id,
            data: model.data,
        }
    }
}
