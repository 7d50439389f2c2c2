use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::traits::{Broker, BrokerError, BrokerResult};

/// Broker that records every publish in memory
#[derive(Debug, Default)]
pub struct MemoryBroker {
    published: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of `(topic, payload)` pairs in publish order
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: &str) -> BrokerResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable);
        }
        self.published
            .lock()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
