//! # Gateway: wires the listener into the sink and runs the lifecycle.
//!
//! The [`Gateway`] is the top of the process. It builds the listener and the
//! sink, brings both to Ready, reports `online` to the parent orchestrator,
//! pumps the merged record stream into the sink, and drives the shutdown
//! sequence when a directive, an OS signal, or a fatal error arrives.
//!
//! ## Lifecycle
//! ```text
//! Starting ──(all workers ready AND sink ready)──► Online
//!    │                                               │
//!    │ startup error                                 │ directive | signal |
//!    ▼                                               ▼ fatal error | drain
//! ShuttingDown ◄─────────────────────────────────────┘
//!    │  cancel token; join!(listener.close(grace), sink.close())
//!    ▼
//! Stopped      exit code: 0 clean, 1 after any error
//! ```
//!
//! ## Rules
//! - `online` is reported once, and only after every worker is Ready and the
//!   sink is ready. After any error the gateway never goes Online again.
//! - A fatal error reports `shutdown` to the parent; a parent-initiated
//!   shutdown does not echo the directive back.
//! - Shutdown completes only once the listener and the sink have both
//!   acknowledged; the listener is bounded by the grace period.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::events::{Bus, Event, EventKind};
use crate::listener::Listener;
use crate::protocol::{Directive, Notice, Record};
use crate::shutdown;
use crate::subscribers::{LogWriter, Subscribe, WorkerRoster};
use crate::uploader::Sink;

/// Capacity of the fault channel; one pending fault is enough to bring the
/// gateway down, the rest are redundant.
const FAULT_CAPACITY: usize = 16;

/// Coordinator-level lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LifecycleState {
    /// Spawning workers, waiting for readiness.
    Starting,
    /// Fully operational; records flow into the sink.
    Online,
    /// Shutdown in progress, waiting for all components to close.
    ShuttingDown,
    /// Everything closed; the process is about to exit.
    Stopped,
}

/// The gateway process: listener + sink + lifecycle coordination.
pub struct Gateway<S: Sink> {
    cfg: GatewayConfig,
    sink: S,
    bus: Bus,
    state: LifecycleState,
}

impl<S: Sink> Gateway<S> {
    /// Creates a gateway over the given sink. Nothing runs until
    /// [`run`](Self::run).
    pub fn new(cfg: GatewayConfig, sink: S) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            cfg,
            sink,
            bus,
            state: LifecycleState::Starting,
        }
    }

    /// The diagnostic event bus. Subscribe before calling [`run`](Self::run)
    /// to observe the full lifecycle.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the gateway to completion.
    ///
    /// `directives` carries lifecycle commands from the parent orchestrator,
    /// `notices` carries `online`/`shutdown` signals back. The binary bridges
    /// these to stdin/stdout; tests wire them directly.
    ///
    /// Returns `Ok(())` after a clean shutdown (parent directive, OS signal,
    /// or all workers finishing on their own) and the first fatal error
    /// otherwise. The caller maps that onto the process exit code.
    pub async fn run(
        mut self,
        mut directives: mpsc::Receiver<Directive>,
        notices: mpsc::Sender<Notice>,
    ) -> Result<(), GatewayError> {
        let roster = WorkerRoster::new();
        roster.spawn_listener(self.bus.subscribe());
        self.spawn_subscribers();

        let token = CancellationToken::new();
        let (records_tx, mut records_rx) = mpsc::channel::<Record>(self.cfg.channel_capacity);
        let (faults_tx, mut faults_rx) = mpsc::channel::<GatewayError>(FAULT_CAPACITY);
        let mut listener = Listener::new(&self.cfg, self.bus.clone(), roster);

        let startup = tokio::try_join!(
            listener.attach_all(&token, records_tx, faults_tx),
            self.sink.ready(),
        );

        if let Err(e) = startup {
            tracing::error!(
                error = %e,
                label = e.as_label(),
                device = e.device().unwrap_or("-"),
                "gateway startup failed"
            );
            self.bus.publish(Event::now(EventKind::ShutdownRequested));
            let _ = notices.send(Notice::ShutdownRequested).await;
            let _ = self
                .shutdown_components(&token, &mut listener, records_rx)
                .await;
            return Err(e);
        }

        self.transition(LifecycleState::Online);
        self.bus.publish(Event::now(EventKind::Online));
        let _ = notices.send(Notice::Online).await;

        let signal = shutdown::wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut parent_open = true;
        let mut failure: Option<GatewayError> = None;
        let mut signal_reason: Option<&'static str> = None;

        loop {
            tokio::select! {
                maybe_record = records_rx.recv() => match maybe_record {
                    Some(record) => {
                        if let Err(e) = self.sink.write(record).await {
                            self.bus.publish(
                                Event::now(EventKind::SinkFailed).with_reason(e.to_string()),
                            );
                            failure = Some(e);
                            break;
                        }
                    }
                    // Every worker closed its stream: natural drain.
                    None => break,
                },

                Some(fault) = faults_rx.recv() => {
                    failure = Some(fault);
                    break;
                }

                directive = recv_or_pending(&mut directives, parent_open) => {
                    match directive {
                        Some(Directive::Shutdown) => break,
                        // Parent link gone; keep running on signals alone.
                        None => parent_open = false,
                    }
                }

                fired = &mut signal => {
                    if let Ok(name) = fired {
                        signal_reason = Some(name);
                    }
                    break;
                }
            }
        }

        let mut shutdown_ev = Event::now(EventKind::ShutdownRequested);
        if let Some(name) = signal_reason {
            shutdown_ev = shutdown_ev.with_reason(name);
        }
        self.bus.publish(shutdown_ev);

        if let Some(e) = &failure {
            tracing::error!(
                error = %e,
                label = e.as_label(),
                device = e.device().unwrap_or("-"),
                "fatal error, shutting down"
            );
            let _ = notices.send(Notice::ShutdownRequested).await;
        }

        let closed = self
            .shutdown_components(&token, &mut listener, records_rx)
            .await;

        match failure {
            Some(e) => Err(e),
            None => closed,
        }
    }

    /// Broadcasts shutdown and waits for the listener and the sink together.
    async fn shutdown_components(
        &mut self,
        token: &CancellationToken,
        listener: &mut Listener,
        records_rx: mpsc::Receiver<Record>,
    ) -> Result<(), GatewayError> {
        self.transition(LifecycleState::ShuttingDown);
        token.cancel();
        // Unblocks any worker waiting on a backpressured send.
        drop(records_rx);

        let grace = self.cfg.grace();
        let (listener_res, sink_res) = tokio::join!(listener.close(grace), self.sink.close());
        self.transition(LifecycleState::Stopped);

        match (listener_res, sink_res) {
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
            _ => Ok(()),
        }
    }

    /// Fans bus events out to the built-in subscribers.
    fn spawn_subscribers(&self) {
        let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                for sub in &subscribers {
                    sub.on_event(&ev).await;
                }
            }
        });
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
    }
}

/// Receives the next directive, or parks forever once the parent link closed
/// so the select loop stops polling a finished channel.
async fn recv_or_pending(
    directives: &mut mpsc::Receiver<Directive>,
    open: bool,
) -> Option<Directive> {
    if open {
        directives.recv().await
    } else {
        std::future::pending().await
    }
}
