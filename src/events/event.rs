//! # Gateway runtime events.
//!
//! [`EventKind`] classifies everything the gateway reports about itself:
//! worker lifecycle (spawned, ready, failed, closing, closed), data-plane
//! faults (decode, sink), and gateway lifecycle (online, shutdown).
//! [`Event`] carries the metadata: which device, why, with what exit code.
//!
//! Every event gets a globally monotonic sequence number, so subscribers can
//! restore exact publish order even if they process events late.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of gateway runtime events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// Worker process launched; handshake starting.
    ///
    /// Sets: `device`.
    WorkerSpawned,

    /// Worker replied `ready`; its data channel will now be merged.
    ///
    /// Sets: `device`.
    WorkerReady,

    /// Worker failed: spawn error, handshake failure, or a post-ready
    /// `error` reply.
    ///
    /// Sets: `device`, `reason`.
    WorkerFailed,

    /// A line on the worker's data channel did not decode.
    ///
    /// Sets: `device`, `reason`.
    DecodeFailed,

    /// Worker is being told to shut down.
    ///
    /// Sets: `device`.
    WorkerClosing,

    /// Worker process exited (or was killed) and has been reaped.
    ///
    /// Sets: `device`, `code` when an exit code was observed.
    WorkerClosed,

    // === Sink ===
    /// The outbound sink rejected a record.
    ///
    /// Sets: `reason`.
    SinkFailed,

    // === Gateway lifecycle ===
    /// Every worker and the sink are ready.
    Online,

    /// Shutdown begun (parent directive, OS signal, or fatal error).
    ShutdownRequested,

    /// All workers closed within the shutdown grace period.
    AllClosedWithin,

    /// Grace period elapsed with workers still open.
    GraceExceeded,
}

/// A gateway runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Device path, for worker-scoped events.
    pub device: Option<Arc<str>>,
    /// Human-readable reason (fault payloads, decoder messages).
    pub reason: Option<Arc<str>>,
    /// Worker exit code, when one was observed.
    pub code: Option<i32>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and the
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            device: None,
            reason: None,
            code: None,
        }
    }

    /// Attaches the device path.
    #[inline]
    pub fn with_device(mut self, device: impl Into<Arc<str>>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an observed worker exit code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}
