//! # The outbound sink and its default implementation.
//!
//! The gateway only needs the sink's write contract: report readiness, accept
//! one [`Record`] at a time, close in an orderly way. Actual network delivery
//! lives behind the [`Sink`] trait; the built-in [`Uploader`] just logs each
//! record and leaves real transports to downstream [`Sink`] implementations.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::UploaderConfig;
use crate::error::GatewayError;
use crate::protocol::Record;

/// Write contract of the outbound sink.
///
/// The gateway calls `ready` once during startup, `write` once per merged
/// record (records are whole decoded units, never fragments), and `close`
/// once during shutdown. Any error is a [`GatewayError::Sink`] and is fatal
/// to the gateway.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Resolves once the sink can accept records.
    async fn ready(&mut self) -> Result<(), GatewayError>;

    /// Accepts one record. The gateway awaits each write before pulling the
    /// next record, so a slow sink throttles the workers through the bounded
    /// merge channel.
    async fn write(&mut self, record: Record) -> Result<(), GatewayError>;

    /// Flushes and releases the sink.
    async fn close(&mut self) -> Result<(), GatewayError>;
}

/// Default sink: logs every record at info level.
pub struct Uploader {
    cfg: UploaderConfig,
}

impl Uploader {
    /// Creates an uploader with the given sink options.
    pub fn new(cfg: UploaderConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Sink for Uploader {
    async fn ready(&mut self) -> Result<(), GatewayError> {
        debug!(options = ?self.cfg.options, "uploader ready");
        Ok(())
    }

    async fn write(&mut self, record: Record) -> Result<(), GatewayError> {
        info!(device = %record.device, payload = %record.payload, "sending record");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        debug!("uploader closed");
        Ok(())
    }
}
