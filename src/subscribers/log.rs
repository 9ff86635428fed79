//! # Logging subscriber.
//!
//! [`LogWriter`] maps diagnostic events onto `tracing` records. The binary
//! routes `tracing` output to stderr, which is the operator-facing channel;
//! stdout is reserved for the orchestrator protocol.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Forwards every bus event to `tracing`.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, event: &Event) {
        let device = event.device.as_deref().unwrap_or("-");
        let reason = event.reason.as_deref().unwrap_or("");
        match event.kind {
            EventKind::WorkerSpawned => info!(device, "worker spawned, connecting"),
            EventKind::WorkerReady => info!(device, "worker ready"),
            EventKind::WorkerFailed => error!(device, reason, "worker failed"),
            EventKind::DecodeFailed => error!(device, reason, "malformed data-channel record"),
            EventKind::WorkerClosing => debug!(device, "closing worker"),
            EventKind::WorkerClosed => info!(device, code = ?event.code, "worker closed"),
            EventKind::SinkFailed => error!(reason, "sink rejected record"),
            EventKind::Online => info!("gateway online"),
            EventKind::ShutdownRequested => warn!("shutdown requested"),
            EventKind::AllClosedWithin => info!("all workers closed within grace"),
            EventKind::GraceExceeded => error!("shutdown grace exceeded"),
        }
    }
}
