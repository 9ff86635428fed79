//! # WorkerActor: supervision loop for one device worker.
//!
//! One actor per configured device, spawned by the
//! [`Listener`](super::Listener). The actor owns its
//! [`WorkerHandle`](super::WorkerHandle) end to end:
//!
//! ```text
//! spawn ──► connect ──► handshake ──► pump ──► terminate
//!              │            │           │
//!              │            │           ├─ data line → decode → merged channel
//!              │            │           ├─ `error` reply → worker fault
//!              │            │           └─ cancellation → graceful close
//!              │            └─ ready / error / deadline / channel EOF
//!              └─ {"event":"connect","config":{...}} on worker stdin
//! ```
//!
//! ## Rules
//! - The data channel is not read until the handshake completes, so a worker
//!   never contributes records before it is Ready.
//! - Records enter the merged channel as whole decoded units, in the order
//!   the worker emitted them.
//! - Cancellation is honored at safe points: the handshake wait, the data
//!   read, and the (possibly backpressured) merged-channel send.
//! - Every exit path runs `terminate`, so the child process is always reaped.
//! - Exactly one attach resolution is sent, `Ok` on ready or `Err` on any
//!   startup failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::{DeviceConfig, FailurePolicy};
use crate::error::GatewayError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{decode_record, ControlReply, ControlRequest, Record};

use super::worker::{WorkerHandle, WorkerState};

/// Timing and policy parameters for a worker actor.
#[derive(Clone, Copy)]
pub(crate) struct WorkerActorParams {
    /// Containment policy for post-ready failures.
    pub policy: FailurePolicy,
    /// Deadline for the `connect` → `ready` exchange.
    pub handshake_timeout: Duration,
    /// Grace given to the worker process after the `shutdown` message.
    pub term_grace: Duration,
}

/// Supervises a single device worker process.
pub(crate) struct WorkerActor {
    config: DeviceConfig,
    params: WorkerActorParams,
    bus: Bus,
    records: mpsc::Sender<Record>,
    faults: mpsc::Sender<GatewayError>,
}

impl WorkerActor {
    pub(crate) fn new(
        config: DeviceConfig,
        params: WorkerActorParams,
        bus: Bus,
        records: mpsc::Sender<Record>,
        faults: mpsc::Sender<GatewayError>,
    ) -> Self {
        Self {
            config,
            params,
            bus,
            records,
            faults,
        }
    }

    /// Runs the actor until the worker closes, fails, or the token cancels.
    ///
    /// `attached` resolves once the handshake concludes: `Ok(())` when the
    /// worker reached Ready, the startup error otherwise.
    pub(crate) async fn run(
        self,
        token: CancellationToken,
        attached: oneshot::Sender<Result<(), GatewayError>>,
    ) {
        let device: Arc<str> = Arc::from(self.config.path.as_str());

        let mut handle = match WorkerHandle::spawn(self.config.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                self.bus.publish(
                    Event::now(EventKind::WorkerFailed)
                        .with_device(device.clone())
                        .with_reason(e.to_string()),
                );
                // No process to reap; report the terminal state directly.
                self.bus
                    .publish(Event::now(EventKind::WorkerClosed).with_device(device));
                let _ = attached.send(Err(e));
                return;
            }
        };

        handle.state = WorkerState::Connecting;
        self.bus
            .publish(Event::now(EventKind::WorkerSpawned).with_device(device.clone()));

        if let Err(e) = self.handshake(&mut handle, &token).await {
            handle.state = WorkerState::Errored;
            self.bus.publish(
                Event::now(EventKind::WorkerFailed)
                    .with_device(device.clone())
                    .with_reason(e.to_string()),
            );
            self.close(&mut handle).await;
            let _ = attached.send(Err(e));
            return;
        }

        handle.state = WorkerState::Ready;
        self.bus
            .publish(Event::now(EventKind::WorkerReady).with_device(device.clone()));
        let _ = attached.send(Ok(()));

        let outcome = self.pump(&mut handle, &token).await;
        if outcome.is_err() {
            handle.state = WorkerState::Errored;
        }
        self.close(&mut handle).await;

        if let Err(e) = outcome {
            match self.params.policy {
                // The gateway turns the fault into a whole-process shutdown.
                FailurePolicy::FailFast => {
                    let _ = self.faults.try_send(e);
                }
                // Contained: the worker is already terminated, siblings keep
                // running. The bus carried the diagnostics.
                FailurePolicy::Isolate => {
                    tracing::warn!(
                        device = %device,
                        error = %e,
                        "worker isolated after failure"
                    );
                }
            }
        }
    }

    /// Sends `connect` and waits for the worker's first meaningful reply.
    ///
    /// `ready` succeeds, `error` fails, unknown or unparseable replies are
    /// skipped. Bounded by the handshake deadline and by cancellation; EOF on
    /// the control channel fails the handshake.
    async fn handshake(
        &self,
        handle: &mut WorkerHandle,
        token: &CancellationToken,
    ) -> Result<(), GatewayError> {
        handle
            .send(&ControlRequest::Connect {
                config: self.config.clone(),
            })
            .await?;

        let device = handle.device.clone();
        let handshake_err = |reason: String| GatewayError::Handshake {
            device: device.to_string(),
            reason,
        };

        let deadline = tokio::time::sleep(self.params.handshake_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    return Err(handshake_err("cancelled before ready".into()));
                }
                _ = &mut deadline => {
                    return Err(handshake_err(format!(
                        "no ready within {:?}",
                        self.params.handshake_timeout
                    )));
                }
                line = handle.replies.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match ControlReply::parse(&line) {
                            Ok(ControlReply::Ready) => return Ok(()),
                            Ok(ControlReply::Error { error }) => {
                                return Err(handshake_err(error.to_string()));
                            }
                            // Unknown events and stray diagnostics are skipped.
                            Ok(ControlReply::Unknown) | Err(_) => continue,
                        }
                    }
                    Ok(None) => {
                        return Err(handshake_err("control channel closed before ready".into()));
                    }
                    Err(e) => {
                        return Err(handshake_err(format!("control channel read: {e}")));
                    }
                },
            }
        }
    }

    /// Streams decoded records into the merged channel until the worker
    /// closes, fails, or the token cancels.
    async fn pump(
        &self,
        handle: &mut WorkerHandle,
        token: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let device = handle.device.clone();
        let mut replies_open = true;

        loop {
            let records = &mut handle.records;
            let replies = &mut handle.replies;

            tokio::select! {
                _ = token.cancelled() => return Ok(()),

                line = records.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let payload = match decode_record(&line) {
                            Ok(payload) => payload,
                            Err(e) => {
                                self.bus.publish(
                                    Event::now(EventKind::DecodeFailed)
                                        .with_device(device.clone())
                                        .with_reason(e.to_string()),
                                );
                                return Err(GatewayError::Decode {
                                    device: device.to_string(),
                                    reason: e.to_string(),
                                });
                            }
                        };
                        let record = Record { device: device.clone(), payload };
                        // Backpressured send; stays responsive to shutdown.
                        tokio::select! {
                            _ = token.cancelled() => return Ok(()),
                            sent = self.records.send(record) => {
                                if sent.is_err() {
                                    // Consumer gone: the gateway is shutting down.
                                    return Ok(());
                                }
                            }
                        }
                    }
                    // Clean end of stream: the worker is done.
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        return Err(GatewayError::Decode {
                            device: device.to_string(),
                            reason: format!("data channel read: {e}"),
                        });
                    }
                },

                reply = async {
                    if replies_open {
                        replies.next_line().await
                    } else {
                        std::future::pending().await
                    }
                } => match reply {
                    Ok(Some(line)) => {
                        if let Ok(ControlReply::Error { error }) = ControlReply::parse(&line) {
                            let reason = error.to_string();
                            self.bus.publish(
                                Event::now(EventKind::WorkerFailed)
                                    .with_device(device.clone())
                                    .with_reason(reason.clone()),
                            );
                            return Err(GatewayError::Fault {
                                device: device.to_string(),
                                reason,
                            });
                        }
                    }
                    Ok(None) | Err(_) => {
                        replies_open = false;
                    }
                },
            }
        }
    }

    /// Terminates the worker process and publishes the closing events.
    async fn close(&self, handle: &mut WorkerHandle) {
        handle.state = WorkerState::Closing;
        self.bus
            .publish(Event::now(EventKind::WorkerClosing).with_device(handle.device.clone()));

        let code = handle.terminate(self.params.term_grace).await;

        handle.state = WorkerState::Closed;
        let mut ev = Event::now(EventKind::WorkerClosed).with_device(handle.device.clone());
        if let Some(code) = code {
            ev = ev.with_code(code);
        }
        self.bus.publish(ev);
    }
}
