//! Event dispatch
//!
//! Maps an event type to the handler that processes it.

mod dispatcher;
mod error;

pub use dispatcher::{EventDispatcher, EventHandler};
pub use error::{HandlerError, HandlerResult};
