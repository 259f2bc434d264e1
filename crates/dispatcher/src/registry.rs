//! Live session registry.
//!
//! Sessions are added and removed by connect/disconnect and only read-iterated
//! for delivery. It is independent of the race lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{Message, SessionSink};
use parking_lot::RwLock;
use tracing::debug;

use crate::metrics::MetricsSnapshot;
use crate::session::{SessionHandle, SessionId};

/// Concurrent map of open sessions
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, SessionHandle>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl SessionRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity,
        }
    }

    /// Spawn a writer for `sink` and register it
    pub fn register<S: SessionSink + Send + 'static>(&self, sink: S) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = SessionHandle::spawn(id, sink, self.queue_capacity);
        debug!(session_id = id, session = %handle.name(), "Session registered");
        self.sessions.write().insert(id, handle);
        id
    }

    pub fn remove(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.write().remove(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Queue `messages` for one session; returns false if it is gone
    pub fn send_to(&self, id: SessionId, messages: &[Message]) -> bool {
        let sessions = self.sessions.read();
        let Some(handle) = sessions.get(&id) else {
            return false;
        };
        for message in messages {
            handle.try_send(message.clone());
        }
        true
    }

    /// Queue `messages` for every open session; returns the number of sessions reached
    pub fn broadcast(&self, messages: &[Message]) -> usize {
        let sessions = self.sessions.read();
        let mut reached = 0;
        for handle in sessions.values().filter(|h| h.is_open()) {
            for message in messages {
                handle.try_send(message.clone());
            }
            reached += 1;
        }
        reached
    }

    /// `name open:<bool>` for every session, in connection order
    pub fn describe(&self) -> Vec<String> {
        self.sessions
            .read()
            .values()
            .map(|h| format!("{} open:{}", h.name(), h.is_open()))
            .collect()
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sessions
            .read()
            .values()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Remove every session and wait for the writers to drain
    pub async fn shutdown_all(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.sessions.write())
            .into_values()
            .collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
