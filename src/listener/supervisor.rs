//! # Listener: supervises the device workers and merges their streams.
//!
//! The [`Listener`] owns one worker actor per configured device and the
//! `JoinSet` they run in.
//!
//! ## High-level architecture
//! ```text
//! Inputs to attach_all():
//!   ListenerConfig.devices  ──►  one WorkerActor per DeviceConfig
//!       │
//!       └──► actors.spawn(actor.run(token.child_token(), attach_tx))
//!
//! Readiness:
//!   every actor resolves its attach oneshot (ready / startup error);
//!   attach_all succeeds only when all resolve Ok, the first Err wins.
//!
//! Data plane:
//!   worker stdout ─► decode ─► bounded mpsc (merged stream) ─► gateway ─► sink
//!   (many producers, one consumer; capacity gives backpressure)
//!
//! Shutdown:
//!   gateway cancels the token ─► every actor terminates its worker
//!   close(grace) joins the actors, naming stragglers via the roster
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::Record;
use crate::subscribers::WorkerRoster;

use super::actor::{WorkerActor, WorkerActorParams};

/// Supervises the configured device workers and exposes their merged output.
pub struct Listener {
    devices: Vec<crate::config::DeviceConfig>,
    params: WorkerActorParams,
    bus: Bus,
    roster: WorkerRoster,
    actors: JoinSet<()>,
}

impl Listener {
    /// Creates a listener for the devices in `cfg`.
    ///
    /// `roster` must be subscribed to the same bus; the listener relies on it
    /// for the stuck-worker report when shutdown overruns the grace period.
    pub fn new(cfg: &GatewayConfig, bus: Bus, roster: WorkerRoster) -> Self {
        Self {
            devices: cfg.listener.devices.clone(),
            params: WorkerActorParams {
                policy: cfg.on_failure,
                handshake_timeout: cfg.handshake_timeout(),
                term_grace: cfg.term_grace(),
            },
            bus,
            roster,
            actors: JoinSet::new(),
        }
    }

    /// Spawns every worker and waits until all of them are Ready.
    ///
    /// Spawns and handshakes run concurrently; one device's launch failure
    /// never blocks another's launch. The aggregate fails with the first
    /// startup error and does not wait for the remaining outcomes; the
    /// caller is expected to cancel `token` and [`close`](Self::close).
    ///
    /// `records` is the merged stream: each actor clones the sender, the
    /// gateway holds the single receiver.
    pub async fn attach_all(
        &mut self,
        token: &CancellationToken,
        records: mpsc::Sender<Record>,
        faults: mpsc::Sender<GatewayError>,
    ) -> Result<(), GatewayError> {
        let mut pending = Vec::with_capacity(self.devices.len());

        for device in self.devices.clone() {
            let path = device.path.clone();
            self.roster.register(&path).await;

            let (attach_tx, attach_rx) = oneshot::channel();
            let actor = WorkerActor::new(
                device,
                self.params,
                self.bus.clone(),
                records.clone(),
                faults.clone(),
            );
            self.actors.spawn(actor.run(token.child_token(), attach_tx));
            pending.push((path, attach_rx));
        }

        // Only the actors hold senders now; the merged stream ends when the
        // last worker closes.
        drop(records);
        drop(faults);

        for (path, attach_rx) in pending {
            match attach_rx.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(GatewayError::Handshake {
                        device: path,
                        reason: "worker task ended before completing the handshake".into(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Waits for every actor to finish within `grace`.
    ///
    /// The caller must have cancelled the runtime token first. On overrun the
    /// remaining actors are aborted (their children are reaped via
    /// kill-on-drop) and the error names the still-open workers.
    pub async fn close(&mut self, grace: Duration) -> Result<(), GatewayError> {
        let actors = &mut self.actors;
        let all_joined = async {
            while actors.join_next().await.is_some() {}
        };
        let timed = tokio::time::timeout(grace, all_joined).await;

        match timed {
            Ok(()) => {
                self.bus.publish(Event::now(EventKind::AllClosedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.bus.publish(Event::now(EventKind::GraceExceeded));
                let stuck = self.roster.snapshot().await;
                self.actors.abort_all();
                Err(GatewayError::GraceExceeded { grace, stuck })
            }
        }
    }
}
