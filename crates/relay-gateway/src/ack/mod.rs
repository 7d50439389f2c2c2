//! Acknowledgment waits
//!
//! Correlates outbound frames that require an acknowledgment with the peer's
//! `__ack__` frame, bounded by a timeout.

mod waiter;

pub use waiter::{AckError, AckWaiter, PendingAck};
