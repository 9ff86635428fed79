//! The subscriber contract for gateway diagnostic events.

use async_trait::async_trait;

use crate::events::Event;

/// Receives every event published on the gateway's bus.
///
/// Handlers run on the gateway's fan-out task and should return quickly;
/// anything slow belongs in the subscriber's own task.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per published event, in publish order.
    async fn on_event(&self, event: &Event);
}
