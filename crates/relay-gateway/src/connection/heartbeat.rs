//! Liveness probing
//!
//! Every interval the connection is sent a WebSocket ping. The peer's pong
//! refreshes the connection's liveness timestamp (see the socket reader). A
//! connection that stays silent longer than the timeout is closed with
//! `HeartbeatTimeout`, regardless of what the transport reports.

use super::{Connection, ConnectionError};
use crate::protocol::CloseCode;
use relay_common::RelayConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest ping interval; the ticker cannot run with a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between pings
    pub interval: Duration,
    /// Silence after which the connection is considered dead
    pub timeout: Duration,
}

impl HeartbeatConfig {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for HeartbeatConfig {
    fn from(config: &RelayConfig) -> Self {
        Self::new(config.heartbeat_interval(), config.heartbeat_timeout())
    }
}

/// Why the heartbeat loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// Peer went silent; a close with `HeartbeatTimeout` was requested
    TimedOut,
    /// Connection left the `Active` state or its writer went away
    Stopped,
}

/// Ping a connection until it dies or stops being active
pub async fn run_heartbeat(connection: Arc<Connection>, config: HeartbeatConfig) -> HeartbeatExit {
    let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !connection.is_active() {
            return HeartbeatExit::Stopped;
        }

        let silent_for = connection.since_liveness();
        if silent_for > config.timeout {
            tracing::warn!(
                principal_id = %connection.principal(),
                session_id = %connection.session_id(),
                silent_ms = silent_for.as_millis(),
                "Connection timed out (no heartbeat response)"
            );
            // A missing writer means teardown is already under way
            connection.close(CloseCode::HeartbeatTimeout).ok();
            return HeartbeatExit::TimedOut;
        }

        match connection.send_ping() {
            Ok(()) => {
                tracing::trace!(session_id = %connection.session_id(), "Heartbeat ping sent");
            }
            Err(ConnectionError::Backpressure) => {
                tracing::trace!(
                    session_id = %connection.session_id(),
                    "Outbound queue full, skipping heartbeat ping"
                );
            }
            Err(ConnectionError::Closed) => return HeartbeatExit::Stopped,
        }
    }
}
