//! Subscribers consuming the diagnostic event bus.

mod log;
mod roster;
mod subscribe;

pub use log::LogWriter;
pub use roster::WorkerRoster;
pub use subscribe::Subscribe;
