//! Storage and broker backends
//!
//! Postgres archives messages and Redis holds the offline queue and carries
//! pub/sub. Either can be left unconfigured: without Postgres nothing is
//! archived, without Redis the offline queue lives in process memory and
//! publishes go nowhere.

use async_trait::async_trait;
use relay_cache::{OfflineQueueStore, Publisher, RedisPool};
use relay_common::{AppConfig, AppError, AppResult};
use relay_core::{
    Broker, BrokerResult, MemoryStorage, Message, MessageFilter, PrincipalId, Storage,
    StorageError, StorageResult,
};
use relay_db::PgMessageRepository;
use std::sync::Arc;

/// `Storage` composed of an optional archive and an optional offline queue.
///
/// Without an archive, messages are not retained. Without a Redis queue,
/// offline payloads are held in memory until drained.
pub struct GatewayStorage {
    archive: Option<PgMessageRepository>,
    offline: Option<OfflineQueueStore>,
    offline_fallback: MemoryStorage,
}

impl GatewayStorage {
    #[must_use]
    pub fn new(archive: Option<PgMessageRepository>, offline: Option<OfflineQueueStore>) -> Self {
        Self {
            archive,
            offline,
            offline_fallback: MemoryStorage::new(),
        }
    }

    /// No archive, offline queue in process memory
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for GatewayStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayStorage")
            .field("archive", &if self.archive.is_some() { "postgres" } else { "disabled" })
            .field("offline", &if self.offline.is_some() { "redis" } else { "memory" })
            .finish()
    }
}

#[async_trait]
impl Storage for GatewayStorage {
    async fn store_message(&self, message: &Message) -> StorageResult<()> {
        match &self.archive {
            Some(archive) => archive.store(message).await,
            None => {
                tracing::trace!(event = %message.event, "Archive skipped (no database configured)");
                Ok(())
            }
        }
    }

    async fn get_messages(&self, filter: &MessageFilter) -> StorageResult<Vec<Message>> {
        match &self.archive {
            Some(archive) => archive.find(filter).await,
            None => Ok(Vec::new()),
        }
    }

    async fn append_offline_message(
        &self,
        recipient: &PrincipalId,
        payload: &str,
    ) -> StorageResult<()> {
        match &self.offline {
            Some(offline) => offline
                .append(recipient, payload)
                .await
                .map_err(StorageError::from),
            None => self.offline_fallback.append_offline_message(recipient, payload).await,
        }
    }

    async fn get_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<Vec<String>> {
        match &self.offline {
            Some(offline) => offline.list(recipient).await.map_err(StorageError::from),
            None => self.offline_fallback.get_offline_messages(recipient).await,
        }
    }

    async fn clear_offline_messages(&self, recipient: &PrincipalId) -> StorageResult<()> {
        match &self.offline {
            Some(offline) => offline.clear(recipient).await.map_err(StorageError::from),
            None => self.offline_fallback.clear_offline_messages(recipient).await,
        }
    }

    async fn trim_offline_messages(&self, recipient: &PrincipalId, count: usize) -> StorageResult<()> {
        match &self.offline {
            Some(offline) => offline
                .trim(recipient, count)
                .await
                .map_err(StorageError::from),
            None => self.offline_fallback.trim_offline_messages(recipient, count).await,
        }
    }
}

/// Broker for a single instance: nothing else is listening
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBroker;

#[async_trait]
impl Broker for LocalBroker {
    async fn publish(&self, topic: &str, _payload: &str) -> BrokerResult<()> {
        tracing::trace!(topic = %topic, "Publish skipped (no broker configured)");
        Ok(())
    }
}

/// Connect the configured backends.
///
/// A configured backend that cannot be reached is a startup failure.
pub async fn build_backends(config: &AppConfig) -> AppResult<(Arc<dyn Storage>, Arc<dyn Broker>)> {
    let archive = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to PostgreSQL...");
            let db_config = relay_db::DatabaseConfig::new(database.url.clone())
                .with_connections(database.min_connections, database.max_connections);
            let pool = relay_db::create_pool(&db_config)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            relay_db::ensure_schema(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");
            Some(PgMessageRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, messages will not be archived");
            None
        }
    };

    let (offline, broker): (Option<OfflineQueueStore>, Arc<dyn Broker>) = match &config.redis {
        Some(redis) => {
            tracing::info!("Connecting to Redis...");
            let pool = RedisPool::from_config(redis).map_err(|e| AppError::Cache(e.to_string()))?;
            pool.health_check()
                .await
                .map_err(|e| AppError::Cache(e.to_string()))?;
            tracing::info!("Redis connection established");
            (
                Some(OfflineQueueStore::new(
                    pool.clone(),
                    config.relay.topic_prefix.clone(),
                )),
                Arc::new(Publisher::new(pool)),
            )
        }
        None => {
            tracing::warn!("REDIS_URL not set, offline queue kept in memory and pub/sub disabled");
            (None, Arc::new(LocalBroker))
        }
    };

    Ok((Arc::new(GatewayStorage::new(archive, offline)), broker))
}
