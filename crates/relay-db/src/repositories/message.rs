//! PostgreSQL message archive

use sqlx::PgPool;
use tracing::instrument;

use relay_core::{Message, MessageFilter, StorageError, StorageResult};

use crate::models::MessageModel;

fn map_db_error(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StorageError::Unavailable,
        other => StorageError::Backend(other.to_string()),
    }
}

/// Archives messages in the `messages` table
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a message to the archive
    #[instrument(skip(self, message), fields(event = %message.event))]
    pub async fn store(&self, message: &Message) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (event, namespace, ack_id, sender_id, receiver_id, room_id, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&message.event)
        .bind(message.namespace.as_deref())
        .bind(message.ack_id.as_deref())
        .bind(message.sender_id.as_ref().map(|p| p.as_str()))
        .bind(message.receiver_id.as_ref().map(|p| p.as_str()))
        .bind(message.room_id.as_deref())
        .bind(&message.data)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    /// Query the archive, oldest first
    #[instrument(skip(self))]
    pub async fn find(&self, filter: &MessageFilter) -> StorageResult<Vec<Message>> {
        let results = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, event, namespace, ack_id, sender_id, receiver_id, room_id, data, created_at
            FROM messages
            WHERE ($1::TEXT IS NULL OR sender_id = $1)
              AND ($2::TEXT IS NULL OR receiver_id = $2)
              AND ($3::TEXT IS NULL OR room_id = $3)
              AND ($4::TEXT IS NULL OR event = $4)
            ORDER BY id ASC
            LIMIT $5
            "#,
        )
        .bind(filter.sender_id.as_ref().map(|p| p.as_str()))
        .bind(filter.receiver_id.as_ref().map(|p| p.as_str()))
        .bind(filter.room_id.as_deref())
        .bind(filter.event.as_deref())
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }
}

impl std::fmt::Debug for PgMessageRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgMessageRepository").finish_non_exhaustive()
    }
}
