//! RaceHub - the race lock owner and router
//!
//! Every inbound envelope and timer event is applied to the controller under
//! one lock, and its result is queued to the sessions before the lock is
//! released. Clients therefore observe broadcasts in the order the race
//! produced them. Queueing never blocks: each session has its own writer.

use std::sync::Arc;
use std::time::Duration;

use contracts::{DispatchResult, Message, RaceConfig, RaceError, RaceState, SessionSink};
use observability::metrics::{record_broadcast, record_sessions};
use observability::MetricsSummary;
use parking_lot::Mutex;
use race_engine::{PeriodicTimeBroadcaster, RaceController, Robot, ScheduledEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::MetricsSnapshot;
use crate::recent::RecentBroadcasts;
use crate::registry::SessionRegistry;
use crate::session::SessionId;

/// Interval of the connected-sessions debug log
const SESSION_STAT_INTERVAL: Duration = Duration::from_secs(10);

pub struct RaceHub {
    controller: Mutex<RaceController>,
    sessions: SessionRegistry,
    recent: RecentBroadcasts,
}

impl RaceHub {
    /// Build a hub and the receiver of its timer events
    ///
    /// The receiver must be driven by [`run_events`](Self::run_events);
    /// [`start`](Self::start) does that along with the periodic tasks.
    pub fn new(config: &RaceConfig) -> (Arc<Self>, UnboundedReceiver<ScheduledEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            controller: Mutex::new(RaceController::new(&config.laps, tx)),
            sessions: SessionRegistry::new(config.server.session_queue_capacity),
            recent: RecentBroadcasts::new(config.server.recent_broadcasts),
        };
        (Arc::new(hub), rx)
    }

    /// Build a hub and spawn its timer event loop, periodic TIME broadcaster
    /// and session stat logger
    pub fn start(config: &RaceConfig) -> HubHandle {
        let (hub, events) = Self::new(config);

        let broadcaster = {
            let controller = hub.controller.lock();
            PeriodicTimeBroadcaster::new(
                controller.stopwatch().clone(),
                config.laps.time_send_interval_ms,
                controller.event_sender(),
            )
        };

        let tasks = vec![
            tokio::spawn(Arc::clone(&hub).run_events(events)),
            broadcaster.spawn(),
            tokio::spawn(Arc::clone(&hub).log_sessions_periodically()),
        ];
        info!(
            circuit = ?config.laps.circuit,
            time_send_interval_ms = config.laps.time_send_interval_ms,
            "Race hub started"
        );

        HubHandle { hub, tasks }
    }

    /// Register a client and queue its greeting
    pub fn connect<S: SessionSink + Send + 'static>(&self, sink: S) -> SessionId {
        let controller = self.controller.lock();
        let id = self.sessions.register(sink);
        self.sessions.send_to(id, &controller.greeting());
        drop(controller);

        record_sessions(self.sessions.len());
        debug!(session_id = id, sessions = self.sessions.len(), "Connection established");
        id
    }

    /// Unregister a client and wait for its writer to drain
    pub async fn disconnect(&self, id: SessionId) {
        if let Some(handle) = self.sessions.remove(id) {
            debug!(session_id = id, session = %handle.name(), "Connection closed");
            handle.shutdown().await;
        }
        record_sessions(self.sessions.len());
    }

    /// Decode and apply one inbound text frame from `origin`
    pub fn handle_text(&self, origin: SessionId, text: &str) {
        debug!(session_id = origin, payload = %text, "Inbound message");
        match Message::from_json(text) {
            Ok(message) => self.handle_message(origin, &message),
            Err(e) => self.reply_error(origin, &e),
        }
    }

    /// Apply one inbound envelope from `origin`
    ///
    /// Failures are answered with an `ERROR` envelope to `origin` only.
    #[instrument(level = "debug", name = "hub_handle_message", skip(self, message), fields(kind = %message.kind))]
    pub fn handle_message(&self, origin: SessionId, message: &Message) {
        let mut controller = self.controller.lock();
        match controller.handle(message) {
            Ok(result) => self.route(Some(origin), &result),
            Err(e) => {
                drop(controller);
                self.reply_error(origin, &e);
            }
        }
    }

    /// Apply one timer event
    pub fn fire(&self, event: ScheduledEvent) {
        let mut controller = self.controller.lock();
        match controller.fire(event) {
            Ok(result) => self.route(None, &result),
            Err(e) => error!(?event, error = %e, "Scheduled event failed"),
        }
    }

    /// Drive timer events until the sender side closes
    pub async fn run_events(self: Arc<Self>, mut events: UnboundedReceiver<ScheduledEvent>) {
        while let Some(event) = events.recv().await {
            self.fire(event);
        }
        debug!("Scheduled event loop stopped");
    }

    async fn log_sessions_periodically(self: Arc<Self>) {
        let mut interval = tokio::time::interval(SESSION_STAT_INTERVAL);
        loop {
            interval.tick().await;
            self.log_sessions();
        }
    }

    /// Log the connected sessions at debug level
    pub fn log_sessions(&self) {
        let sessions = self.sessions.describe().join(", ");
        debug!(count = self.sessions.len(), sessions = %sessions, "Connected websocket clients");
    }

    fn route(&self, origin: Option<SessionId>, result: &DispatchResult) {
        if result.is_empty() {
            return;
        }
        if result.is_broadcast() {
            self.recent.record(&result.messages);
            let reached = self.sessions.broadcast(&result.messages);
            record_broadcast(result.messages.len(), reached);
            return;
        }
        match origin {
            Some(id) => {
                self.sessions.send_to(id, &result.messages);
            }
            None => warn!(
                messages = result.messages.len(),
                "Single reply without an origin session dropped"
            ),
        }
    }

    fn reply_error(&self, origin: SessionId, error: &RaceError) {
        if error.is_protocol() {
            warn!(session_id = origin, error = %error, "Rejected inbound message");
        } else {
            error!(session_id = origin, error = %error, "Exception happened during message handling");
        }
        self.sessions
            .send_to(origin, &[Message::error(error.to_string())]);
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Side channel of recent broadcasts
    pub fn recent(&self) -> &RecentBroadcasts {
        &self.recent
    }

    pub fn state(&self) -> RaceState {
        self.controller.lock().state()
    }

    /// Robots in rank order
    pub fn robots(&self) -> Vec<Robot> {
        self.controller.lock().robots().to_vec()
    }

    pub fn session_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sessions.metrics()
    }

    pub fn summary(&self) -> MetricsSummary {
        self.controller.lock().stats().summary()
    }
}

/// A started hub and its background tasks
pub struct HubHandle {
    hub: Arc<RaceHub>,
    tasks: Vec<JoinHandle<()>>,
}

impl HubHandle {
    pub fn hub(&self) -> &Arc<RaceHub> {
        &self.hub
    }

    /// Stop the background tasks and drain every session
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.hub.sessions.shutdown_all().await;
        info!("Race hub stopped");
    }
}
