//! Session sink implementations
//!
//! Contains WebSocketSink and ChannelSink.

mod channel;
mod websocket;

pub use self::channel::ChannelSink;
pub use self::websocket::WebSocketSink;
