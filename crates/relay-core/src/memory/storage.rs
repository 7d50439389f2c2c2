use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::entities::{Message, MessageFilter};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::value_objects::PrincipalId;

/// Storage kept entirely in process memory
#[derive(Default)]
pub struct MemoryStorage {
    messages: Mutex<Vec<Message>>,
    offline: Mutex<HashMap<PrincipalId, Vec<String>>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of archived messages
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Snapshot of a recipient's offline queue
    pub fn offline_snapshot(&self, recipient: &str) -> Vec<String> {
        self.offline.lock().get(recipient).cloned().unwrap_or_default()
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("messages", &self.messages.lock().len())
            .field("offline_recipients", &self.offline.lock().len())
            .finish()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store_message(&self, message: &Message) -> StorageResult<()> {
        self.check()?;
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn get_messages(&self, filter: &MessageFilter) -> StorageResult<Vec<Message>> {
        self.check()?;
        let limit = usize::try_from(filter.effective_limit()).unwrap_or(usize::MAX);
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| filter.matches(m))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn append_offline_message(
        &self,
        recipient: &PrincipalId,
        payload: &str,
    ) -> StorageResult<()> {
        self.check()?;
        self.offline
            .lock()
            .entry(recipient.clone())
            .or_default()
            .push(payload.to_string());
        tracing::debug!(recipient = %recipient, "Queued offline message");
        Ok(())
    }

    async fn get_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<Vec<String>> {
        self.check()?;
        Ok(self.offline_snapshot(recipient.as_str()))
    }

    async fn clear_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<()> {
        self.check()?;
        self.offline.lock().remove(recipient);
        Ok(())
    }

    async fn trim_offline_messages(&self, recipient: &PrincipalId, count: usize) -> StorageResult<()> {
        self.check()?;
        let mut offline = self.offline.lock();
        if let Some(queue) = offline.get_mut(recipient) {
            queue.drain(..count.min(queue.len()));
            if queue.is_empty() {
                offline.remove(recipient);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_offline_queue_keeps_insertion_order() {
        let storage = MemoryStorage::new();
        let u2 = PrincipalId::from("u2");

        storage.append_offline_message(&u2, "a").await.unwrap();
        storage.append_offline_message(&u2, "b").await.unwrap();

        assert_eq!(storage.get_offline_messages(&u2).await.unwrap(), vec!["a", "b"]);

        let drained = storage.drain_offline_messages(&u2).await.unwrap();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(storage.get_offline_messages(&u2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trim_keeps_later_appends() {
        let storage = MemoryStorage::new();
        let u2 = PrincipalId::from("u2");

        storage.append_offline_message(&u2, "a").await.unwrap();
        storage.append_offline_message(&u2, "b").await.unwrap();
        let read = storage.get_offline_messages(&u2).await.unwrap();
        storage.append_offline_message(&u2, "c").await.unwrap();

        storage.trim_offline_messages(&u2, read.len()).await.unwrap();
        assert_eq!(storage.offline_snapshot("u2"), vec!["c"]);

        storage.trim_offline_messages(&u2, 10).await.unwrap();
        assert!(storage.offline_snapshot("u2").is_empty());
        storage.trim_offline_messages(&PrincipalId::from("nobody"), 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_messages_applies_filter() {
        let storage = MemoryStorage::new();
        for i in 0..3 {
            let msg = Message::new("chat", json!(i)).with_sender(PrincipalId::from("u1"));
            storage.store_message(&msg).await.unwrap();
        }
        storage
            .store_message(&Message::new("chat", json!("x")).with_sender(PrincipalId::from("u9")))
            .await
            .unwrap();

        let filter = MessageFilter::default().sender(PrincipalId::from("u1")).limit(2);
        let found = storage.get_messages(&filter).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].data, json!(0));
        assert_eq!(storage.message_count(), 4);
    }

    #[tokio::test]
    async fn test_failing_storage() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let result = storage.store_message(&Message::new("chat", json!(null))).await;
        assert!(matches!(result, Err(StorageError::Unavailable)));
    }
}
