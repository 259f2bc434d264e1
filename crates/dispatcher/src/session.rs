//! SessionHandle - one client session with an isolated outbound queue and writer task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Message, SessionSink};
use observability::metrics::record_session_drop;

use crate::metrics::SessionMetrics;

/// Process-unique session identifier
pub type SessionId = u64;

/// Handle to a running session writer
pub struct SessionHandle {
    id: SessionId,
    /// Sink name, usually the peer address
    name: String,
    /// Channel to the writer task
    tx: mpsc::Sender<Message>,
    metrics: Arc<SessionMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SessionHandle {
    /// Create a new SessionHandle and spawn its writer task
    pub fn spawn<S: SessionSink + Send + 'static>(
        id: SessionId,
        sink: S,
        queue_capacity: usize,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SessionMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            session_writer(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            id,
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Whether the writer is still accepting envelopes
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue an envelope for the client (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full or the writer stopped
    pub fn try_send(&self, message: Message) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(m)) => {
                self.metrics.inc_dropped_count();
                record_session_drop(&self.name);
                warn!(
                    session = %self.name,
                    kind = %m.kind,
                    "Queue full, envelope dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session = %self.name, "Session writer closed");
                false
            }
        }
    }

    /// Drain the queue, close the sink and wait for the writer
    #[instrument(name = "session_handle_shutdown", skip(self), fields(session = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(session = %self.name, error = ?e, "Writer task panicked");
        }
        debug!(session = %self.name, "SessionHandle shutdown complete");
    }
}

/// Writer task that drains the queue into the sink
#[instrument(name = "session_writer_loop", skip(sink, rx, metrics), fields(session = %name))]
async fn session_writer<S: SessionSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Message>,
    metrics: Arc<SessionMetrics>,
    name: String,
) {
    debug!(session = %name, "Session writer started");

    while let Some(message) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.send(&message).await {
            Ok(()) => metrics.inc_sent_count(),
            Err(e) => {
                metrics.inc_failure_count();
                error!(session = %name, kind = %message.kind, error = %e, "Send failed");
            }
        }
    }

    if let Err(e) = sink.close().await {
        debug!(session = %name, error = %e, "Close failed on shutdown");
    }

    debug!(session = %name, "Session writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MessageType, RaceError, RaceState};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        sent: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str, sent: &Arc<AtomicU64>) -> Self {
            Self {
                name: name.to_string(),
                sent: Arc::clone(sent),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl SessionSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&mut self, _message: &Message) -> Result<(), RaceError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(RaceError::delivery(&self.name, "mock failure"));
            }
            self.sent.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), RaceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_handle_basic() {
        let sent = Arc::new(AtomicU64::new(0));
        let handle = SessionHandle::spawn(1, MockSink::new("test", &sent), 10);

        for _ in 0..5 {
            assert!(handle.try_send(Message::state(RaceState::Ready)));
        }

        handle.shutdown().await;
        assert_eq!(sent.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_session_handle_queue_full() {
        let sent = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            delay_ms: 100,
            ..MockSink::new("slow", &sent)
        };
        let handle = SessionHandle::spawn(2, sink, 2);

        for _ in 0..10 {
            handle.try_send(Message::new(MessageType::Time));
        }

        assert!(handle.metrics().dropped_count() > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_session_handle_failure_isolation() {
        let sent = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            should_fail: true,
            ..MockSink::new("failing", &sent)
        };
        let handle = SessionHandle::spawn(3, sink, 10);

        for _ in 0..3 {
            handle.try_send(Message::new(MessageType::Laps));
        }

        sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.metrics().failure_count(), 3);
        assert!(handle.is_open());
        handle.shutdown().await;
    }
}
