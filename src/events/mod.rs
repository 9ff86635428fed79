//! Diagnostic events published by the gateway runtime.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
