//! Shared helpers: sh-script mock workers speaking the gateway protocol.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use devgate::{DeviceConfig, GatewayConfig};

/// Materializes an executable `/bin/sh` worker script.
pub fn worker_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Handshakes, emits the given data lines, then waits for `shutdown`.
pub fn ready_worker(lines: &[&str]) -> String {
    let mut body = String::from("read _connect\nprintf '%s\\n' '{\"event\":\"ready\"}' >&2\n");
    for line in lines {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    body.push_str("read _shutdown\nexit 0\n");
    body
}

/// Handshakes, emits the given data lines, then exits on its own.
pub fn draining_worker(lines: &[&str]) -> String {
    let mut body = String::from("read _connect\nprintf '%s\\n' '{\"event\":\"ready\"}' >&2\n");
    for line in lines {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    body.push_str("exit 0\n");
    body
}

/// Emits an unrecognized control reply before `ready`, then the given data
/// lines, then waits for `shutdown`.
pub fn chatty_worker(lines: &[&str]) -> String {
    let mut body = String::from("read _connect\n");
    body.push_str("printf '%s\\n' '{\"event\":\"progress\",\"pct\":40}' >&2\n");
    body.push_str("printf '%s\\n' '{\"event\":\"ready\"}' >&2\n");
    for line in lines {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    body.push_str("read _shutdown\nexit 0\n");
    body
}

/// Accepts `connect` and exits without ever replying.
pub fn eof_worker() -> String {
    "read _connect\nexit 0\n".to_string()
}

/// Replies `error` instead of `ready`.
pub fn error_worker(reason: &str) -> String {
    format!(
        "read _connect\nprintf '%s\\n' '{{\"event\":\"error\",\"error\":\"{reason}\"}}' >&2\nread _shutdown\nexit 1\n"
    )
}

/// Accepts `connect` and then never replies.
pub fn silent_worker() -> String {
    "read _connect\nsleep 30\n".to_string()
}

pub fn device(path: &str, module: &Path) -> DeviceConfig {
    DeviceConfig {
        path: path.to_string(),
        module: module.to_path_buf(),
        args: Vec::new(),
        options: serde_json::Map::new(),
    }
}

/// Gateway config with test-friendly deadlines.
pub fn test_config(devices: Vec<DeviceConfig>) -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.listener.devices = devices;
    cfg.handshake_timeout_ms = 2_000;
    cfg.grace_ms = 3_000;
    cfg.term_grace_ms = 500;
    cfg.channel_capacity = 64;
    cfg.bus_capacity = 256;
    cfg
}
