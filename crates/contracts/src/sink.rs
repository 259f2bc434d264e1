//! SessionSink trait - Gateway output interface
//!
//! Defines the abstract interface for delivering envelopes to one client.

use crate::{Message, RaceError};

/// Outbound delivery trait
///
/// Implemented by the WebSocket writer half and by in-process test sinks.
#[trait_variant::make(SessionSink: Send)]
pub trait LocalSessionSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one envelope
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn send(&mut self, message: &Message) -> Result<(), RaceError>;

    /// Close the underlying connection
    async fn close(&mut self) -> Result<(), RaceError>;
}
