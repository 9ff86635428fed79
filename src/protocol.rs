//! # Wire protocols spoken by the gateway.
//!
//! Three small protocols, all line oriented:
//!
//! ## Control channel (per worker)
//! JSON objects tagged on `"event"`, one per line.
//! - gateway → worker (worker stdin): [`ControlRequest`]
//!   - `{"event":"connect","config":{...}}` opens the handshake and delivers
//!     the device configuration.
//!   - `{"event":"shutdown"}` asks the worker to exit.
//! - worker → gateway (worker stderr): [`ControlReply`]
//!   - `{"event":"ready"}` the worker is initialized and will emit data.
//!   - `{"event":"error","error":...}` the worker failed.
//!   - anything else is ignored.
//!
//! ## Data channel (per worker)
//! The worker's stdout: newline-delimited JSON, one line decoded into one
//! [`Record`]. Decoding happens per line; a record is placed on the merged
//! stream only as a whole decoded unit, so concurrent workers can never
//! splice each other's output.
//!
//! ## Orchestrator link (gateway ↔ parent process)
//! [`Notice`] lines on the gateway's stdout (`online`, `shutdown`) and
//! [`Directive`] lines on its stdin (`shutdown`). Process exit code 0 means a
//! clean stop, 1 a stop after an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DeviceConfig;

/// Control message sent from the gateway to a worker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ControlRequest {
    /// Opens the handshake and delivers the device configuration.
    Connect {
        /// The full device configuration, extra options included.
        config: DeviceConfig,
    },
    /// Asks the worker to finish up and exit.
    Shutdown,
}

impl ControlRequest {
    /// Encodes the request as a single wire line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Control message sent from a worker to the gateway.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ControlReply {
    /// The worker is initialized and will now emit data.
    Ready,
    /// The worker failed to initialize or hit a fatal fault.
    Error {
        /// Arbitrary fault payload.
        error: Value,
    },
    /// Any other `event` value. Skipped by the gateway.
    #[serde(other)]
    Unknown,
}

impl ControlReply {
    /// Parses one control line. Unknown `event` values parse as
    /// [`ControlReply::Unknown`]; non-JSON lines fail.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// One decoded data-channel record, tagged with the device that produced it.
#[derive(Clone, Debug)]
pub struct Record {
    /// Device path of the producing worker.
    pub device: Arc<str>,
    /// The decoded line, opaque to the gateway.
    pub payload: Value,
}

/// Decodes one data-channel line into a record payload.
pub fn decode_record(line: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(line)
}

/// Lifecycle signal from the gateway to its parent orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// All workers and the sink are ready; the gateway is fully operational.
    Online,
    /// The gateway hit a fatal error and is shutting itself down.
    ShutdownRequested,
}

impl Notice {
    /// The wire line for this notice.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Notice::Online => "online",
            Notice::ShutdownRequested => "shutdown",
        }
    }
}

/// Lifecycle command from the parent orchestrator to the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Graceful termination request.
    Shutdown,
}

impl Directive {
    /// Parses one orchestrator line; unrecognized lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "shutdown" => Some(Directive::Shutdown),
            _ => None,
        }
    }
}
