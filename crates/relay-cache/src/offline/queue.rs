//! Per-recipient offline queue backed by Redis lists.
//!
//! Append is `RPUSH`, read is `LRANGE 0 -1`, trim is `LTRIM n -1`, clear is
//! `DEL`. Read and trim are separate round trips, so a drain is
//! at-least-once; payloads appended in between survive the trim.

use redis::AsyncCommands;
use relay_core::PrincipalId;

use crate::pool::{RedisPool, RedisResult};

/// Offline queue store
#[derive(Debug, Clone)]
pub struct OfflineQueueStore {
    pool: RedisPool,
    prefix: String,
}

impl OfflineQueueStore {
    #[must_use]
    pub fn new(pool: RedisPool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    /// Redis key holding a recipient's queue
    pub fn key(&self, recipient: &PrincipalId) -> String {
        format!("{}:offline:{}", self.prefix, recipient)
    }

    /// Append a payload to the end of a recipient's queue
    pub async fn append(&self, recipient: &PrincipalId, payload: &str) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        let len: u64 = conn.rpush(self.key(recipient), payload).await?;

        tracing::debug!(recipient = %recipient, queued = len, "Queued offline message");
        Ok(())
    }

    /// Read a recipient's queue in insertion order
    pub async fn list(&self, recipient: &PrincipalId) -> RedisResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let payloads: Vec<String> = conn.lrange(self.key(recipient), 0, -1).await?;
        Ok(payloads)
    }

    /// Number of queued payloads
    pub async fn len(&self, recipient: &PrincipalId) -> RedisResult<u64> {
        let mut conn = self.pool.get().await?;
        let len: u64 = conn.llen(self.key(recipient)).await?;
        Ok(len)
    }

    /// Drop the first `count` payloads, keeping anything appended since
    pub async fn trim(&self, recipient: &PrincipalId, count: usize) -> RedisResult<()> {
        if count == 0 {
            return Ok(());
        }
        let start = isize::try_from(count).unwrap_or(isize::MAX);
        let mut conn = self.pool.get().await?;
        conn.ltrim::<_, ()>(self.key(recipient), start, -1).await?;
        Ok(())
    }

    /// Drop a recipient's queue
    pub async fn clear(&self, recipient: &PrincipalId) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(self.key(recipient)).await?;
        Ok(())
    }
}
