//! Offline message queue.

mod queue;

pub use queue::OfflineQueueStore;
