//! Integration test utilities for the relay gateway
//!
//! Spawns a gateway on an ephemeral port with in-memory backends and
//! provides WebSocket and HTTP clients to drive it end to end.

pub mod helpers;

pub use helpers::*;
