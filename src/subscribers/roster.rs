//! # Worker roster: per-device state tracking.
//!
//! [`WorkerRoster`] follows the bus and keeps the current
//! [`WorkerState`](crate::listener::WorkerState) of every configured device.
//! The listener uses it during shutdown to name the workers that did not
//! close within the grace period; tests use it to observe state transitions.
//!
//! ```text
//! WorkerSpawned → Connecting      WorkerClosing → Closing
//! WorkerReady   → Ready           WorkerClosed  → Closed
//! WorkerFailed  → Errored
//! DecodeFailed  → Errored
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::events::{Event, EventKind};
use crate::listener::WorkerState;

/// Tracks the lifecycle state of every supervised worker.
///
/// Cloneable; clones share the same map.
#[derive(Clone, Default)]
pub struct WorkerRoster {
    inner: Arc<Mutex<HashMap<Arc<str>, WorkerState>>>,
}

impl WorkerRoster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device before its worker is spawned.
    pub async fn register(&self, device: &str) {
        self.inner
            .lock()
            .await
            .insert(Arc::from(device), WorkerState::Spawning);
    }

    /// Spawns a background task that applies bus events to the roster.
    ///
    /// The task exits when the bus is dropped.
    pub fn spawn_listener(&self, mut rx: tokio::sync::broadcast::Receiver<Event>) {
        let inner = self.inner.clone();

        tokio::spawn(async move {
            loop {
                let ev = match rx.recv().await {
                    Ok(ev) => ev,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let next = match ev.kind {
                    EventKind::WorkerSpawned => Some(WorkerState::Connecting),
                    EventKind::WorkerReady => Some(WorkerState::Ready),
                    EventKind::WorkerFailed | EventKind::DecodeFailed => Some(WorkerState::Errored),
                    EventKind::WorkerClosing => Some(WorkerState::Closing),
                    EventKind::WorkerClosed => Some(WorkerState::Closed),
                    _ => None,
                };
                if let (Some(state), Some(device)) = (next, ev.device) {
                    inner.lock().await.insert(device, state);
                }
            }
        });
    }

    /// Current state of one device, if it is registered.
    pub async fn state(&self, device: &str) -> Option<WorkerState> {
        self.inner.lock().await.get(device).copied()
    }

    /// Device paths of all workers that have not reached
    /// [`WorkerState::Closed`]. Used for the grace-exceeded report.
    pub async fn snapshot(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .iter()
            .filter(|(_, state)| **state != WorkerState::Closed)
            .map(|(device, _)| device.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    const DEV: &str = "tmr:///dev/ttyACM1";

    async fn settle() {
        // give the listener task a chance to drain the bus
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_tracks_lifecycle_transitions() {
        let bus = Bus::new(16);
        let roster = WorkerRoster::new();
        roster.register(DEV).await;
        roster.spawn_listener(bus.subscribe());

        assert_eq!(roster.state(DEV).await, Some(WorkerState::Spawning));

        bus.publish(Event::now(EventKind::WorkerSpawned).with_device(DEV));
        bus.publish(Event::now(EventKind::WorkerReady).with_device(DEV));
        settle().await;
        assert_eq!(roster.state(DEV).await, Some(WorkerState::Ready));

        bus.publish(Event::now(EventKind::WorkerClosing).with_device(DEV));
        bus.publish(Event::now(EventKind::WorkerClosed).with_device(DEV));
        settle().await;
        assert_eq!(roster.state(DEV).await, Some(WorkerState::Closed));
    }

    #[tokio::test]
    async fn test_snapshot_names_open_workers_only() {
        let bus = Bus::new(16);
        let roster = WorkerRoster::new();
        roster.register("a").await;
        roster.register("b").await;
        roster.spawn_listener(bus.subscribe());

        bus.publish(Event::now(EventKind::WorkerClosed).with_device("a"));
        settle().await;

        let stuck = roster.snapshot().await;
        assert_eq!(stuck, vec!["b".to_string()]);
    }
}
