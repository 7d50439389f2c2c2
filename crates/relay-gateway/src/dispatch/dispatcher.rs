//! Event dispatcher
//!
//! Handlers are plain async closures stored by event type. Registering a
//! type twice replaces the earlier handler.

use super::HandlerResult;
use crate::connection::Connection;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use relay_core::Message;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A registered event handler
pub type EventHandler =
    Arc<dyn Fn(Arc<Connection>, Arc<Message>) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

/// Event type to handler table
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<String, EventHandler>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new dispatcher wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a handler for an event type, replacing any previous one.
    ///
    /// Returns true if a handler was replaced.
    pub fn register<F, Fut>(&self, event: impl Into<String>, handler: F) -> bool
    where
        F: Fn(Arc<Connection>, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let event = event.into();
        let boxed: EventHandler = Arc::new(
            move |conn: Arc<Connection>, msg: Arc<Message>| -> BoxFuture<'static, HandlerResult<()>> {
                Box::pin(handler(conn, msg))
            },
        );
        let replaced = self.handlers.write().insert(event.clone(), boxed).is_some();

        tracing::debug!(event = %event, replaced, "Event handler registered");
        replaced
    }

    /// Remove the handler for an event type
    pub fn unregister(&self, event: &str) -> bool {
        self.handlers.write().remove(event).is_some()
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.read().contains_key(event)
    }

    /// Run the handler for the message's event type on the caller's task.
    ///
    /// Returns `Ok(false)` if no handler is registered.
    pub async fn dispatch(
        &self,
        connection: &Arc<Connection>,
        message: Arc<Message>,
    ) -> HandlerResult<bool> {
        let handler = self.handlers.read().get(&message.event).cloned();

        let Some(handler) = handler else {
            tracing::debug!(
                session_id = %connection.session_id(),
                event = %message.event,
                "No handler for event, dropping"
            );
            return Ok(false);
        };

        handler(connection.clone(), message).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<String> = self.handlers.read().keys().cloned().collect();
        events.sort();
        f.debug_struct("EventDispatcher")
            .field("events", &events)
            .finish()
    }
}
