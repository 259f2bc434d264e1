//! Recent-broadcast side channel.
//!
//! A bounded ring of broadcast envelopes that a narration consumer polls. It
//! never feeds back into race state.

use std::collections::VecDeque;

use contracts::{Message, MessageType};
use parking_lot::Mutex;

/// Envelope types worth narrating
const NARRATED: [MessageType; 7] = [
    MessageType::Lap,
    MessageType::State,
    MessageType::Time,
    MessageType::LapMan,
    MessageType::PitStop,
    MessageType::PitStopFinish,
    MessageType::RobotRemove,
];

/// Bounded queue of recent broadcasts, oldest first
#[derive(Debug)]
pub struct RecentBroadcasts {
    capacity: usize,
    queue: Mutex<VecDeque<Message>>,
}

impl RecentBroadcasts {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn is_narrated(kind: MessageType) -> bool {
        NARRATED.contains(&kind)
    }

    /// Keep the narrated envelopes of one broadcast, evicting the oldest
    pub fn record(&self, messages: &[Message]) {
        let mut queue = self.queue.lock();
        for message in messages.iter().filter(|m| Self::is_narrated(m.kind)) {
            if queue.len() == self.capacity {
                queue.pop_front();
            }
            queue.push_back(message.clone());
        }
    }

    /// Take the oldest envelope
    pub fn poll(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Take everything queued
    pub fn drain(&self) -> Vec<Message> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
