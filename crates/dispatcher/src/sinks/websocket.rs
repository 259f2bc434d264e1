//! WebSocketSink - writer half of a client WebSocket

use axum::extract::ws::{Message as WsMessage, WebSocket};
use contracts::{Message, RaceError, SessionSink};
use futures::stream::SplitSink;
use futures::SinkExt;
use tracing::{debug, instrument};

/// Session sink writing JSON text frames
pub struct WebSocketSink {
    name: String,
    sender: SplitSink<WebSocket, WsMessage>,
}

impl WebSocketSink {
    pub fn new(name: impl Into<String>, sender: SplitSink<WebSocket, WsMessage>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

impl SessionSink for WebSocketSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        level = "trace",
        name = "websocket_sink_send",
        skip(self, message),
        fields(session = %self.name, kind = %message.kind)
    )]
    async fn send(&mut self, message: &Message) -> Result<(), RaceError> {
        let text = message.to_json()?;
        self.sender
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| RaceError::delivery(&self.name, e.to_string()))
    }

    #[instrument(name = "websocket_sink_close", skip(self), fields(session = %self.name))]
    async fn close(&mut self) -> Result<(), RaceError> {
        debug!(session = %self.name, "Closing websocket");
        self.sender
            .close()
            .await
            .map_err(|e| RaceError::delivery(&self.name, e.to_string()))
    }
}
