//! # WorkerHandle: one supervised device process.
//!
//! Owns the child process and its three line-framed channels:
//!
//! ```text
//! gateway ── stdin  ──► worker     control requests (connect, shutdown)
//! gateway ◄─ stderr ──  worker     control replies  (ready, error)
//! gateway ◄─ stdout ──  worker     data channel     (one JSON record per line)
//! ```
//!
//! A handle is exclusively owned by its worker actor; nothing else reads or
//! writes these channels.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::config::DeviceConfig;
use crate::error::GatewayError;
use crate::protocol::ControlRequest;

/// Lifecycle state of a supervised worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Process launch in progress.
    Spawning,
    /// Process launched, `connect` sent, waiting for `ready`.
    Connecting,
    /// Handshake complete; data channel contributes to the merged stream.
    Ready,
    /// The worker failed (handshake, fault, or decode error).
    Errored,
    /// Shutdown requested, waiting for the process to exit.
    Closing,
    /// Process exited and was reaped.
    Closed,
}

/// A spawned worker process with its control and data channels.
pub struct WorkerHandle {
    /// Device path, the worker's identity in logs and events.
    pub device: Arc<str>,
    /// Configuration the worker was spawned from.
    pub config: DeviceConfig,
    /// Current lifecycle state. Mutated only by the owning actor.
    pub state: WorkerState,
    pub(crate) child: Child,
    pub(crate) control: ChildStdin,
    pub(crate) replies: Lines<BufReader<ChildStderr>>,
    pub(crate) records: Lines<BufReader<ChildStdout>>,
}

impl WorkerHandle {
    /// Launches the worker executable named by `config.module` with all
    /// three stdio channels piped.
    ///
    /// Launch failure is a [`GatewayError::Spawn`]; it never affects sibling
    /// spawns. `kill_on_drop` backstops reaping if the owning task is
    /// dropped.
    pub async fn spawn(config: DeviceConfig) -> Result<Self, GatewayError> {
        let device: Arc<str> = Arc::from(config.path.as_str());
        let spawn_err = |source: std::io::Error| GatewayError::Spawn {
            device: config.path.clone(),
            source,
        };

        let mut child = Command::new(&config.module)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let control = child
            .stdin
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stdin not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stderr not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stdout not captured")))?;

        Ok(Self {
            device,
            config,
            state: WorkerState::Spawning,
            child,
            control,
            replies: BufReader::new(stderr).lines(),
            records: BufReader::new(stdout).lines(),
        })
    }

    /// Writes one control request as a single line and flushes it.
    pub async fn send(&mut self, request: &ControlRequest) -> Result<(), GatewayError> {
        let to_err = |reason: String| GatewayError::Handshake {
            device: self.device.to_string(),
            reason,
        };
        let mut line = request
            .to_line()
            .map_err(|e| to_err(format!("control encode: {e}")))?;
        line.push('\n');
        self.control
            .write_all(line.as_bytes())
            .await
            .map_err(|e| to_err(format!("control channel write: {e}")))?;
        self.control
            .flush()
            .await
            .map_err(|e| to_err(format!("control channel flush: {e}")))?;
        Ok(())
    }

    /// Asks the worker to exit and makes sure it does.
    ///
    /// Sends the `shutdown` control message, waits up to `grace` for the
    /// process to exit, then kills and reaps it. Returns the exit code when
    /// one was observed.
    pub async fn terminate(&mut self, grace: Duration) -> Option<i32> {
        // A dead worker cannot take the message; the kill path below covers it.
        let _ = self.send(&ControlRequest::Shutdown).await;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(_)) => None,
            Err(_elapsed) => {
                let _ = self.child.start_kill();
                match self.child.wait().await {
                    Ok(status) => status.code(),
                    Err(_) => None,
                }
            }
        }
    }
}
