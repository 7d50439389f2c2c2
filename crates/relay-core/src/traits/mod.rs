//! Ports - interfaces the routing core needs from infrastructure

mod ports;

pub use ports::{Broker, BrokerError, BrokerResult, Storage, StorageError, StorageResult};
