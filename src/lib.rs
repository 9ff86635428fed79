//! # devgate
//!
//! **devgate** is a local device gateway: it runs one isolated worker process
//! per configured device, performs a JSON control handshake with each, merges
//! their newline-delimited data streams into a single record stream, and
//! forwards that stream to an outbound sink.
//!
//! Device drivers crash independently; keeping each in its own process means
//! one bad driver never corrupts the rest of the pipeline, while the rest of
//! the system still sees a single unified stream.
//!
//! ## Architecture
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ DeviceConfig │   │ DeviceConfig │   │ DeviceConfig │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Listener (supervisor)                                      │
//! │  - one WorkerActor per device (spawn, handshake, pump)      │
//! │  - merged record stream (bounded mpsc, backpressured)       │
//! │  - Bus (diagnostic events) + WorkerRoster (state tracking)  │
//! └──────┬──────────────────┬──────────────────┬────────────────┘
//!        ▼                  ▼                  ▼
//!   worker process     worker process     worker process
//!   stdin:  connect/shutdown (control requests)
//!   stderr: ready/error      (control replies)
//!   stdout: one JSON record per line (data channel)
//!
//!                 merged records
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Gateway (lifecycle coordinator)                            │
//! │  - Online once all workers ready AND sink ready             │
//! │  - pumps records into the Sink (Uploader by default)        │
//! │  - shutdown on parent directive, OS signal, or fatal error  │
//! └─────────────────────────────────────────────────────────────┘
//!                       ▼
//!        parent orchestrator: "online"/"shutdown" lines,
//!        exit code 0 (clean) or 1 (after an error)
//! ```
//!
//! ## Failure model
//! By default a single failing device brings the whole gateway down
//! ([`FailurePolicy::FailFast`]); the orchestrator restarts the process.
//! [`FailurePolicy::Isolate`] instead terminates only the offending worker
//! and keeps the siblings streaming. Startup failures always abort startup;
//! the gateway never comes up partially.
//!
//! ## Example
//! ```no_run
//! use devgate::{Gateway, GatewayConfig, Uploader};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), devgate::GatewayError> {
//!     let cfg = GatewayConfig::default();
//!     let uploader = Uploader::new(cfg.uploader.clone());
//!     let (_directives_tx, directives_rx) = mpsc::channel(4);
//!     let (notices_tx, _notices_rx) = mpsc::channel(4);
//!
//!     Gateway::new(cfg, uploader).run(directives_rx, notices_tx).await
//! }
//! ```

mod config;
mod error;
mod events;
mod gateway;
mod listener;
mod protocol;
mod shutdown;
mod subscribers;
mod uploader;

// ---- Public re-exports ----

pub use config::{DeviceConfig, FailurePolicy, GatewayConfig, ListenerConfig, UploaderConfig};
pub use error::GatewayError;
pub use events::{Bus, Event, EventKind};
pub use gateway::Gateway;
pub use listener::{Listener, WorkerHandle, WorkerState};
pub use protocol::{decode_record, ControlReply, ControlRequest, Directive, Notice, Record};
pub use subscribers::{LogWriter, Subscribe, WorkerRoster};
pub use uploader::{Sink, Uploader};
