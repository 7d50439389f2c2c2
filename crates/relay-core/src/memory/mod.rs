//! In-process Storage and Broker implementations
//!
//! Used when no database or Redis is configured, and by tests.

mod broker;
mod storage;

pub use broker::MemoryBroker;
pub use storage::MemoryStorage;
