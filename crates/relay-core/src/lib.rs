//! # relay-core
//!
//! Domain layer containing principal identities, the message entity, and the
//! storage/broker ports the routing core talks to.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod memory;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ACK_EVENT, Message, MessageFilter, MessageTarget};
pub use error::DomainError;
pub use memory::{MemoryBroker, MemoryStorage};
pub use traits::{Broker, BrokerError, BrokerResult, Storage, StorageError, StorageResult};
pub use value_objects::PrincipalId;
