//! Message routing
//!
//! The composition point of the gateway: decodes inbound frames, runs the
//! storage and broker side effects, resolves recipients and drives dispatch.

mod delivery;
mod error;
mod router;

pub use delivery::{outbound_copy, Delivery};
pub use error::{RouterError, RouterResult};
pub use router::MessageRouter;
