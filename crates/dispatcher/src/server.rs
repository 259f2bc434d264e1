//! WebSocket endpoint
//!
//! One route upgrades clients at the configured path. Each connection gets a
//! [`WebSocketSink`] for its writer half; the reader half is drained here and
//! every text frame goes to the hub.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use contracts::ServerConfig;
use futures::StreamExt;
use tokio::net::TcpListener;
use tracing::{debug, info, trace, warn};

use crate::error::DispatcherError;
use crate::hub::RaceHub;
use crate::sinks::WebSocketSink;

/// Router serving the race endpoint at `path`
pub fn router(hub: Arc<RaceHub>, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_endpoint))
        .with_state(hub)
}

async fn ws_endpoint(
    State(hub): State<Arc<RaceHub>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub, addr))
}

/// Drive one client connection until it closes
pub async fn handle_socket(socket: WebSocket, hub: Arc<RaceHub>, addr: SocketAddr) {
    let (sender, mut receiver) = socket.split();
    let id = hub.connect(WebSocketSink::new(addr.to_string(), sender));

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => hub.handle_text(id, &text),
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Binary(data)) => {
                warn!(session_id = id, bytes = data.len(), "Binary frame ignored");
            }
            Ok(_) => trace!(session_id = id, "Control frame"),
            Err(e) => {
                debug!(session_id = id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.disconnect(id).await;
}

/// Bind the listener and serve until `shutdown` resolves
pub async fn serve<F>(
    hub: Arc<RaceHub>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), DispatcherError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DispatcherError::bind(&addr, e))?;

    info!(addr = %addr, path = %config.path, "Race server listening");

    let app = router(hub, &config.path);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(DispatcherError::Serve)?;

    info!("Race server shut down gracefully");
    Ok(())
}
