//! # Gateway configuration.
//!
//! [`GatewayConfig`] is loaded from a JSON file and merged with built-in
//! defaults field by field: any key missing from the file takes its value
//! from [`GatewayConfig::default`]. An empty file (`{}`) therefore yields a
//! fully defaulted gateway with no devices.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use devgate::{FailurePolicy, GatewayConfig};
//!
//! let cfg: GatewayConfig = serde_json::from_str(r#"{ "grace_ms": 10000 }"#).unwrap();
//! assert_eq!(cfg.grace(), Duration::from_secs(10));
//! assert_eq!(cfg.on_failure, FailurePolicy::FailFast);
//! assert!(cfg.listener.devices.is_empty());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Top-level gateway configuration.
///
/// Controls the device set, the sink options, the failure-containment policy,
/// and the runtime deadlines.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Device supervision settings.
    pub listener: ListenerConfig,
    /// Options forwarded to the outbound sink.
    pub uploader: UploaderConfig,
    /// What to do when a ready worker faults or emits a malformed record.
    pub on_failure: FailurePolicy,
    /// Maximum time to wait for all workers to close during shutdown (ms).
    pub grace_ms: u64,
    /// Maximum time a worker may take to reply `ready` after `connect` (ms).
    pub handshake_timeout_ms: u64,
    /// Time a worker is given to exit after the `shutdown` control message
    /// before it is forcibly killed (ms).
    pub term_grace_ms: u64,
    /// Capacity of the merged record channel; full capacity throttles
    /// producers until the sink catches up.
    pub channel_capacity: usize,
    /// Capacity of the diagnostic event bus.
    pub bus_capacity: usize,
}

impl Default for GatewayConfig {
    /// Provides the built-in defaults:
    /// - no devices, empty uploader options
    /// - `on_failure = fail-fast`
    /// - `grace = 30s`, `handshake_timeout = 10s`, `term_grace = 5s`
    /// - `channel_capacity = 256`, `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            uploader: UploaderConfig::default(),
            on_failure: FailurePolicy::default(),
            grace_ms: 30_000,
            handshake_timeout_ms: 10_000,
            term_grace_ms: 5_000,
            channel_capacity: 256,
            bus_capacity: 1024,
        }
    }
}

impl GatewayConfig {
    /// Reads and parses a JSON configuration file.
    ///
    /// Missing keys fall back to the built-in defaults.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| GatewayError::Config {
            reason: format!("{}: {e}", path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| GatewayError::Config {
            reason: format!("{}: {e}", path.display()),
        })
    }

    /// Shutdown grace as a [`Duration`].
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Handshake deadline as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Per-worker termination grace as a [`Duration`].
    pub fn term_grace(&self) -> Duration {
        Duration::from_millis(self.term_grace_ms)
    }
}

/// Device supervision settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// One entry per device to supervise.
    pub devices: Vec<DeviceConfig>,
}

/// Configuration for a single supervised device.
///
/// The whole object (including any extra keys) is forwarded to the worker in
/// the `connect` control message, so device modules can define their own
/// options without the gateway knowing about them.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device identity, e.g. `tmr:///dev/ttyACM1`. Used in logs and events.
    pub path: String,
    /// Executable implementing the device driver.
    pub module: PathBuf,
    /// Extra arguments passed to the worker executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Module-specific options, passed through verbatim.
    #[serde(default, flatten)]
    pub options: Map<String, Value>,
}

/// Options forwarded to the outbound sink, opaque to the gateway.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UploaderConfig {
    /// Sink-specific options, passed through verbatim.
    #[serde(default, flatten)]
    pub options: Map<String, Value>,
}

/// What the gateway does when a ready worker fails.
///
/// Startup failures (spawn, handshake) always abort startup regardless of
/// this setting; the gateway never comes up partially.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// A single worker fault or malformed record shuts the whole gateway
    /// down. This mirrors the historical behavior and is the default.
    #[default]
    FailFast,
    /// The offending worker is terminated and its contribution dropped;
    /// sibling workers keep streaming.
    Isolate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_yields_defaults() {
        let cfg: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.listener.devices.is_empty());
        assert_eq!(cfg.on_failure, FailurePolicy::FailFast);
        assert_eq!(cfg.grace(), Duration::from_secs(30));
        assert_eq!(cfg.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.term_grace(), Duration::from_secs(5));
        assert_eq!(cfg.channel_capacity, 256);
        assert_eq!(cfg.bus_capacity, 1024);
    }

    #[test]
    fn test_defaults_merge_fieldwise() {
        let cfg: GatewayConfig = serde_json::from_value(json!({
            "handshake_timeout_ms": 1500,
            "on_failure": "isolate",
        }))
        .unwrap();
        assert_eq!(cfg.handshake_timeout(), Duration::from_millis(1500));
        assert_eq!(cfg.on_failure, FailurePolicy::Isolate);
        // untouched fields keep their defaults
        assert_eq!(cfg.grace_ms, 30_000);
        assert_eq!(cfg.channel_capacity, 256);
    }

    #[test]
    fn test_device_extra_options_are_captured() {
        let cfg: GatewayConfig = serde_json::from_value(json!({
            "listener": {
                "devices": [
                    {
                        "path": "tmr:///dev/ttyACM1",
                        "module": "/usr/lib/devgate/mockout",
                        "baud": 115200,
                        "antenna": "A"
                    }
                ]
            }
        }))
        .unwrap();

        let device = &cfg.listener.devices[0];
        assert_eq!(device.path, "tmr:///dev/ttyACM1");
        assert_eq!(device.options["baud"], json!(115200));
        assert_eq!(device.options["antenna"], json!("A"));
        assert!(device.args.is_empty());
    }

    #[test]
    fn test_policy_wire_names() {
        let p: FailurePolicy = serde_json::from_value(json!("fail-fast")).unwrap();
        assert_eq!(p, FailurePolicy::FailFast);
        let p: FailurePolicy = serde_json::from_value(json!("isolate")).unwrap();
        assert_eq!(p, FailurePolicy::Isolate);
        assert!(serde_json::from_value::<FailurePolicy>(json!("retry")).is_err());
    }
}
