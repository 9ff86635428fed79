//! Device supervision: worker processes, their actors, and the merged stream.

mod actor;
mod supervisor;
mod worker;

pub use supervisor::Listener;
pub use worker::{WorkerHandle, WorkerState};
