//! Redis Pub/Sub publisher.
//!
//! Publishes encoded frames so other instances can fan them out.

use async_trait::async_trait;
use redis::AsyncCommands;
use relay_core::{Broker, BrokerResult};

use crate::pool::{RedisPool, RedisResult};

/// Redis publisher
#[derive(Debug, Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish a raw payload to a topic, returning the number of receivers
    pub async fn publish_raw(&self, topic: &str, payload: &str) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(topic, payload).await?;

        tracing::trace!(topic = %topic, receivers = receivers, "Published message");

        Ok(receivers)
    }
}

#[async_trait]
impl Broker for Publisher {
    async fn publish(&self, topic: &str, payload: &str) -> BrokerResult<()> {
        self.publish_raw(topic, payload).await?;
        Ok(())
    }
}
