//! Gateway state
//!
//! Application state shared by the WebSocket and admin handlers.

use crate::connection::HeartbeatConfig;
use crate::router::MessageRouter;
use relay_common::{Authenticator, RelayConfig};
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    router: Arc<MessageRouter>,
    authenticator: Arc<dyn Authenticator>,
    relay: Arc<RelayConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        router: Arc<MessageRouter>,
        authenticator: Arc<dyn Authenticator>,
        relay: RelayConfig,
    ) -> Self {
        Self {
            router,
            authenticator,
            relay: Arc::new(relay),
        }
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    /// Routing core settings
    pub fn relay(&self) -> &RelayConfig {
        &self.relay
    }

    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(self.relay.as_ref())
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("router", &self.router)
            .field("relay", &self.relay)
            .finish()
    }
}
