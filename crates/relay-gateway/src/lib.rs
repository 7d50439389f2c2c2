//! # relay-gateway
//!
//! WebSocket gateway for real-time message routing: connection registry,
//! liveness, rooms, acknowledgments, event dispatch, and offline delivery.

pub mod ack;
pub mod connection;
pub mod dispatch;
pub mod handlers;
pub mod protocol;
pub mod room;
pub mod router;
pub mod server;

pub use server::run;
