//! # Event bus for broadcasting gateway diagnostics.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Worker actors,
//! the listener, and the gateway all publish into it; subscribers (logging,
//! the worker roster, tests) each get an independent receiver.
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is
//!   dropped.
//! - Capacity is a shared ring buffer; slow receivers observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest events.
//! - Events are diagnostics, not data: the record stream does not pass
//!   through the bus.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for gateway diagnostic events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Event::now(EventKind::Online));

        assert_eq!(a.recv().await.unwrap().kind, EventKind::Online);
        assert_eq!(b.recv().await.unwrap().kind, EventKind::Online);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = Bus::new(1);
        bus.publish(Event::now(EventKind::ShutdownRequested));
    }
}
