//! Error types used by the gateway.
//!
//! A single enum, [`GatewayError`], covers every failure class the gateway can
//! observe:
//!
//! - [`GatewayError::Spawn`] — a worker process failed to launch.
//! - [`GatewayError::Handshake`] — a worker never reached `ready` (reported
//!   `error`, closed its control channel, or missed the handshake deadline).
//! - [`GatewayError::Fault`] — a worker reported `error` after it was ready.
//! - [`GatewayError::Decode`] — a malformed line on a worker's data channel.
//! - [`GatewayError::Sink`] — the outbound sink rejected a record.
//! - [`GatewayError::GraceExceeded`] — shutdown did not complete in time.
//! - [`GatewayError::Config`] — the configuration file could not be loaded.
//!
//! Under the default `fail-fast` policy all of these are fatal to the whole
//! gateway process; see [`FailurePolicy`](crate::FailurePolicy) for the
//! per-device containment mode.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the gateway runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A worker process could not be launched.
    #[error("failed to spawn worker for {device}: {source}")]
    Spawn {
        /// Device path the worker was configured for.
        device: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A worker did not complete the control handshake.
    #[error("handshake with {device} failed: {reason}")]
    Handshake {
        /// Device path of the failing worker.
        device: String,
        /// What went wrong (error reply, channel closed, deadline missed).
        reason: String,
    },

    /// A worker reported a fatal fault after reaching `ready`.
    #[error("worker for {device} reported a fault: {reason}")]
    Fault {
        /// Device path of the failing worker.
        device: String,
        /// Fault payload from the worker's `error` reply.
        reason: String,
    },

    /// A line on a worker's data channel could not be decoded.
    #[error("malformed record from {device}: {reason}")]
    Decode {
        /// Device path of the offending worker.
        device: String,
        /// Decoder message.
        reason: String,
    },

    /// The outbound sink failed to accept a record or to close.
    #[error("sink failure: {reason}")]
    Sink {
        /// Sink-provided description.
        reason: String,
    },

    /// Shutdown grace period elapsed with workers still open.
    #[error("shutdown grace {grace:?} exceeded; still open: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Device paths of workers that had not closed in time.
        stuck: Vec<String>,
    },

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {reason}")]
    Config {
        /// Loader message.
        reason: String,
    },
}

impl GatewayError {
    /// Returns a short stable label (snake_case) for logs and metrics.
    ///
    /// # Example
    /// ```
    /// use devgate::GatewayError;
    ///
    /// let err = GatewayError::Sink { reason: "connection reset".into() };
    /// assert_eq!(err.as_label(), "sink_failure");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GatewayError::Spawn { .. } => "worker_spawn_failed",
            GatewayError::Handshake { .. } => "worker_handshake_failed",
            GatewayError::Fault { .. } => "worker_fault",
            GatewayError::Decode { .. } => "record_decode_failed",
            GatewayError::Sink { .. } => "sink_failure",
            GatewayError::GraceExceeded { .. } => "shutdown_grace_exceeded",
            GatewayError::Config { .. } => "config_invalid",
        }
    }

    /// Returns the device path this error is attributed to, if any.
    pub fn device(&self) -> Option<&str> {
        match self {
            GatewayError::Spawn { device, .. }
            | GatewayError::Handshake { device, .. }
            | GatewayError::Fault { device, .. }
            | GatewayError::Decode { device, .. } => Some(device),
            _ => None,
        }
    }
}
