//! Storage and broker ports
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Both ports are assumed to be safe under
//! concurrent callers; the core never holds a registry lock while calling them.

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{Message, MessageFilter};
use crate::value_objects::PrincipalId;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage unavailable")]
    Unavailable,
}

/// Broker backend errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Broker unavailable")]
    Unavailable,
}

// ============================================================================
// Storage
// ============================================================================

#[async_trait]
pub trait Storage: Send + Sync {
    /// Archive a message
    async fn store_message(&self, message: &Message) -> StorageResult<()>;

    /// Query archived messages, oldest first
    async fn get_messages(&self, filter: &MessageFilter) -> StorageResult<Vec<Message>>;

    /// Append an encoded payload to a recipient's offline queue
    async fn append_offline_message(
        &self,
        recipient: &PrincipalId,
        payload: &str,
    ) -> StorageResult<()>;

    /// Read a recipient's offline queue in insertion order without clearing it
    async fn get_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<Vec<String>>;

    /// Clear a recipient's offline queue
    async fn clear_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<()>;

    /// Remove the first `count` payloads of a recipient's queue.
    ///
    /// Payloads appended after they were read stay queued.
    async fn trim_offline_messages(&self, recipient: &PrincipalId, count: usize) -> StorageResult<()>;

    /// Read then remove what was read from a recipient's queue.
    ///
    /// Not atomic with delivery: callers that deliver before trimming get
    /// at-least-once semantics.
    async fn drain_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<Vec<String>> {
        let payloads = self.get_offline_messages(recipient).await?;
        if !payloads.is_empty() {
            self.trim_offline_messages(recipient, payloads.len()).await?;
        }
        Ok(payloads)
    }
}

// ============================================================================
// Broker
// ============================================================================

#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a payload to a topic (fire-and-forget)
    async fn publish(&self, topic: &str, payload: &str) -> BrokerResult<()>;
}
