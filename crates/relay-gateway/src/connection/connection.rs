//! Individual WebSocket connection
//!
//! A connection never touches the socket itself. Outbound frames go through a
//! bounded channel drained by a single writer task, which is what serializes
//! writes; closing is signalled through a watch channel the writer observes.

use crate::protocol::CloseCode;
use parking_lot::Mutex;
use relay_core::PrincipalId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Connection lifecycle: `Connecting -> Active -> Closing -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Identity resolved, not yet registered
    Connecting,
    /// Registered and routable
    Active,
    /// Teardown started
    Closing,
    /// Transport closed and removed from the registry
    Closed,
}

/// Item queued for the writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame
    Text(String),
    /// Liveness check (WebSocket ping)
    Ping,
}

/// Connection errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection is closed")]
    Closed,

    #[error("Outbound queue is full")]
    Backpressure,
}

/// A single authenticated connection
pub struct Connection {
    principal: PrincipalId,
    session_id: String,
    state: Mutex<ConnectionState>,
    last_liveness: Mutex<Instant>,
    sender: mpsc::Sender<Outbound>,
    close_signal: watch::Sender<Option<CloseCode>>,
    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new(principal: PrincipalId, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        let (close_signal, _) = watch::channel(None);
        let now = Instant::now();

        Arc::new(Self {
            principal,
            session_id: uuid::Uuid::new_v4().to_string(),
            state: Mutex::new(ConnectionState::Connecting),
            last_liveness: Mutex::new(now),
            sender,
            close_signal,
            created_at: now,
        })
    }

    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    /// Unique per connection, distinguishes reconnects of the same principal
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// `Connecting -> Active`; false from any other state
    pub fn activate(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Active;
            true
        } else {
            false
        }
    }

    /// Enter `Closing`; false if teardown already started
    pub fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ConnectionState::Connecting | ConnectionState::Active => {
                *state = ConnectionState::Closing;
                true
            }
            ConnectionState::Closing | ConnectionState::Closed => false,
        }
    }

    /// Enter `Closed`
    pub fn mark_closed(&self) {
        *self.state.lock() = ConnectionState::Closed;
    }

    /// Record a liveness response from the peer
    pub fn record_liveness(&self) {
        *self.last_liveness.lock() = Instant::now();
    }

    /// Time since the last liveness response
    pub fn since_liveness(&self) -> Duration {
        self.last_liveness.lock().elapsed()
    }

    /// Queue a text frame, waiting for room in the outbound queue
    pub async fn send(&self, frame: String) -> Result<(), ConnectionError> {
        if matches!(
            self.state(),
            ConnectionState::Closing | ConnectionState::Closed
        ) {
            return Err(ConnectionError::Closed);
        }
        self.sender
            .send(Outbound::Text(frame))
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Queue a liveness ping without waiting
    pub fn send_ping(&self) -> Result<(), ConnectionError> {
        self.sender.try_send(Outbound::Ping).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ConnectionError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => ConnectionError::Closed,
        })
    }

    /// Start closing the transport with the given code.
    ///
    /// Only the first close code sticks. Fails if no writer is attached
    /// anymore, meaning the transport is already gone.
    pub fn close(&self, code: CloseCode) -> Result<(), ConnectionError> {
        self.begin_close();
        self.close_signal.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(code);
                true
            } else {
                false
            }
        });

        if self.close_signal.receiver_count() == 0 || self.sender.is_closed() {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    /// Close code requested so far, if any
    pub fn close_reason(&self) -> Option<CloseCode> {
        *self.close_signal.borrow()
    }

    /// Receiver the writer task watches for a close request
    pub fn subscribe_close(&self) -> watch::Receiver<Option<CloseCode>> {
        self.close_signal.subscribe()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("principal", &self.principal)
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}
