//! ChannelSink - delivers envelopes to an in-process receiver

use contracts::{Message, RaceError, SessionSink};
use tokio::sync::mpsc;
use tracing::debug;

/// Session sink backed by an unbounded channel
///
/// Used by in-process observers and tests in place of a socket.
pub struct ChannelSink {
    name: String,
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it
    pub fn new(name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl SessionSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, message: &Message) -> Result<(), RaceError> {
        self.tx
            .send(message.clone())
            .map_err(|_| RaceError::delivery(&self.name, "receiver dropped"))
    }

    async fn close(&mut self) -> Result<(), RaceError> {
        debug!(session = %self.name, "ChannelSink closed");
        Ok(())
    }
}
