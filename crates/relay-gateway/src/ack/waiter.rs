//! Ack waiter
//!
//! One instance is owned by the router and shared by cloning. A correlation
//! ID is generated and registered in one step, so an ack can never arrive
//! for an ID the waiter does not know yet.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Ack wait errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AckError {
    #[error("Timed out waiting for ack {0}")]
    Timeout(String),

    #[error("Ack wait cancelled")]
    Cancelled,

    #[error("Failed to send frame awaiting ack: {0}")]
    Send(String),
}

impl AckError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

struct AckEntry {
    release: oneshot::Sender<()>,
    created_at: Instant,
}

/// Table of outstanding acknowledgment waits
#[derive(Clone, Default)]
pub struct AckWaiter {
    entries: Arc<Mutex<HashMap<String, AckEntry>>>,
}

impl AckWaiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh correlation ID and register a wait for it
    pub fn register(&self) -> PendingAck {
        let (release, rx) = oneshot::channel();
        let mut entries = self.entries.lock();

        let id = loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(
            id.clone(),
            AckEntry {
                release,
                created_at: Instant::now(),
            },
        );

        PendingAck {
            id,
            rx,
            waiter: self.clone(),
        }
    }

    /// Register a wait, hand its ID to `send`, then wait for the ack.
    ///
    /// Returns the correlation ID once acknowledged.
    pub async fn wait<F, Fut, E>(&self, timeout: Duration, send: F) -> Result<String, AckError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let pending = self.register();
        send(pending.id().to_string())
            .await
            .map_err(|e| AckError::Send(e.to_string()))?;
        pending.wait(timeout).await
    }

    /// Resolve the wait registered under `id`.
    ///
    /// Unknown, late or duplicate IDs are ignored. Returns whether a waiter
    /// was released.
    pub fn receive(&self, id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.remove(id) {
            Some(entry) => {
                tracing::trace!(
                    ack_id = %id,
                    waited_ms = entry.created_at.elapsed().as_millis(),
                    "Ack received"
                );
                // Fired under the lock so a timing-out waiter sees it
                entry.release.send(()).ok();
                true
            }
            None => {
                tracing::debug!(ack_id = %id, "Ack for unknown or expired id ignored");
                false
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Cancel every outstanding wait
    pub fn clear(&self) {
        let cancelled = std::mem::take(&mut *self.entries.lock());
        if !cancelled.is_empty() {
            tracing::debug!(count = cancelled.len(), "Cancelled pending acks");
        }
    }

    fn unregister(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }
}

impl std::fmt::Debug for AckWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckWaiter")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// A registered wait; dropping it unregisters the correlation ID
#[derive(Debug)]
pub struct PendingAck {
    id: String,
    rx: oneshot::Receiver<()>,
    waiter: AckWaiter,
}

impl PendingAck {
    /// Correlation ID to attach to the outbound frame
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the ack or the timeout, whichever comes first
    pub async fn wait(mut self, timeout: Duration) -> Result<String, AckError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(())) => Ok(self.id.clone()),
            Ok(Err(_)) => Err(AckError::Cancelled),
            Err(_) => {
                // Already gone means receive won the race and fired
                if !self.waiter.unregister(&self.id) && self.rx.try_recv().is_ok() {
                    return Ok(self.id.clone());
                }
                tracing::debug!(ack_id = %self.id, "Ack wait timed out");
                Err(AckError::Timeout(self.id.clone()))
            }
        }
    }
}

impl Drop for PendingAck {
    fn drop(&mut self) {
        self.waiter.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[tokio::test(start_paused = true)]
    async fn test_receive_before_timeout_succeeds() {
        let waiter = AckWaiter::new();
        let pending = waiter.register();
        let id = pending.id().to_string();

        let remote = waiter.clone();
        let ack_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            remote.receive(&ack_id);
        });

        assert_eq!(pending.wait(Duration::from_secs(5)).await, Ok(id));
        assert_eq!(waiter.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_receive_times_out() {
        let waiter = AckWaiter::new();
        let pending = waiter.register();
        let id = pending.id().to_string();

        let started = Instant::now();
        let err = pending.wait(Duration::from_secs(5)).await.unwrap_err();

        assert_eq!(err, AckError::Timeout(id.clone()));
        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(waiter.pending_count(), 0);

        // Late ack is a silent no-op
        assert!(!waiter.receive(&id));
    }

    #[tokio::test]
    async fn test_duplicate_receive_is_noop() {
        let waiter = AckWaiter::new();
        let pending = waiter.register();
        let id = pending.id().to_string();

        assert!(waiter.receive(&id));
        assert!(!waiter.receive(&id));
        assert_eq!(pending.wait(Duration::from_secs(1)).await, Ok(id));
    }

    #[tokio::test]
    async fn test_unknown_id_is_ignored() {
        let waiter = AckWaiter::new();
        assert!(!waiter.receive("nope"));
    }

    #[test]
    fn test_register_generates_unique_ids() {
        let waiter = AckWaiter::new();
        let a = waiter.register();
        let b = waiter.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(waiter.pending_count(), 2);
    }

    #[test]
    fn test_dropping_pending_unregisters() {
        let waiter = AckWaiter::new();
        let pending = waiter.register();
        let id = pending.id().to_string();
        drop(pending);

        assert_eq!(waiter.pending_count(), 0);
        assert!(!waiter.receive(&id));
    }

    #[tokio::test]
    async fn test_wait_registers_before_send() {
        let waiter = AckWaiter::new();
        let peer = waiter.clone();

        // The peer acks from inside send, before wait starts suspending
        let id = waiter
            .wait(Duration::from_secs(1), |id| async move {
                assert!(peer.receive(&id));
                Ok::<_, Infallible>(())
            })
            .await
            .unwrap();

        assert!(!id.is_empty());
        assert_eq!(waiter.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_reports_send_failure() {
        let waiter = AckWaiter::new();
        let err = waiter
            .wait(Duration::from_secs(1), |_| async { Err("writer gone") })
            .await
            .unwrap_err();

        assert_eq!(err, AckError::Send("writer gone".to_string()));
        assert_eq!(waiter.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_cancels_waiters() {
        let waiter = AckWaiter::new();
        let pending = waiter.register();
        waiter.clear();

        assert_eq!(
            pending.wait(Duration::from_secs(1)).await,
            Err(AckError::Cancelled)
        );
    }
}
