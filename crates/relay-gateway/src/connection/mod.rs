//! Connection management
//!
//! Live connections, the principal-keyed registry, and liveness probing.

mod connection;
mod heartbeat;
mod registry;

pub use connection::{Connection, ConnectionError, ConnectionState, Outbound};
pub use heartbeat::{run_heartbeat, HeartbeatConfig, HeartbeatExit};
pub use registry::ConnectionRegistry;
