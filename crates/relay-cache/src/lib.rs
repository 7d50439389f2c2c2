//! # relay-cache
//!
//! Redis layer for the offline queue and pub/sub fan-out.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Offline Queue**: One Redis list per recipient, drained on resume
//! - **Pub/Sub**: `Broker` implementation over Redis `PUBLISH`
//!
//! ## Example
//!
//! ```ignore
//! use relay_cache::{OfflineQueueStore, PubSubChannel, Publisher, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let offline = OfflineQueueStore::new(pool.clone(), "relay");
//! let publisher = Publisher::new(pool);
//!
//! offline.append(&recipient, &payload).await?;
//! publisher.publish_raw(&PubSubChannel::broadcast().topic("relay"), &payload).await?;
//! ```

pub mod offline;
pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export offline queue types
pub use offline::OfflineQueueStore;

// Re-export pubsub types
pub use pubsub::{PubSubChannel, Publisher, BROADCAST_CHANNEL, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
