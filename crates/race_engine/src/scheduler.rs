//! Deferred actions and the periodic TIME broadcaster.
//!
//! Timers never touch race state. When one fires it sends a [`ScheduledEvent`]
//! to the owner of the race lock, which re-enters the controller through
//! [`RaceController::fire`](crate::RaceController::fire).
//!
//! Both timer kinds wake [`EARLY_WAKE_MS`] before their target and then spin
//! with `yield_now` until the stopwatch reaches it, so the race time they
//! report is exact. The spin window is bounded by the early-wake margin plus
//! scheduler jitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{RaceTime, Serial};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

use crate::stopwatch::Stopwatch;

/// How long before the target a timer stops sleeping and starts spinning
pub const EARLY_WAKE_MS: RaceTime = 10;

/// Poll interval of the periodic broadcaster while the race clock is stopped
const IDLE_POLL: Duration = Duration::from_millis(20);

/// One-shot action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Finish the race when the time limit is reached
    AutoFinish,
    /// End the pit stop of a robot
    PitStopFinish { serial: Serial },
}

/// Timer output consumed by the race lock owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// A one-shot action reached its target race time
    Deferred {
        generation: u64,
        target: RaceTime,
        action: DeferredAction,
    },
    /// The race clock crossed a multiple of the broadcast interval
    Tick { boundary: RaceTime },
}

/// Handle to a scheduled one-shot action
#[derive(Debug)]
pub struct ScheduledAction {
    target: RaceTime,
    abort: AbortHandle,
}

impl ScheduledAction {
    /// Race time the action fires at
    pub fn target(&self) -> RaceTime {
        self.target
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Cancellable one-shot timers keyed by a generation counter
///
/// `cancel_all` aborts every pending timer and bumps the generation, so an
/// action that already left its wait is still recognised as stale.
#[derive(Debug)]
pub struct DeferredActionScheduler {
    stopwatch: Stopwatch,
    events: UnboundedSender<ScheduledEvent>,
    generation: Arc<AtomicU64>,
    pending: Vec<AbortHandle>,
}

impl DeferredActionScheduler {
    pub fn new(stopwatch: Stopwatch, events: UnboundedSender<ScheduledEvent>) -> Self {
        Self {
            stopwatch,
            events,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Vec::new(),
        }
    }

    pub fn events(&self) -> UnboundedSender<ScheduledEvent> {
        self.events.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fire `action` `delay` milliseconds of race time from now
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_once(&mut self, delay: RaceTime, action: DeferredAction) -> ScheduledAction {
        let target = self.stopwatch.time() + delay;
        self.schedule_at(target, action)
    }

    /// Fire `action` when the race clock reaches `target`
    pub fn schedule_at(&mut self, target: RaceTime, action: DeferredAction) -> ScheduledAction {
        self.pending.retain(|handle| !handle.is_finished());

        let generation = self.generation();
        let stopwatch = self.stopwatch.clone();
        let events = self.events.clone();
        let current = Arc::clone(&self.generation);

        let task = tokio::spawn(async move {
            if !wait_until(&stopwatch, target).await {
                debug!(?action, target, "Race clock stopped before deferred action");
                return;
            }
            if current.load(Ordering::Acquire) != generation {
                debug!(?action, target, "Dropping stale deferred action");
                return;
            }
            let _ = events.send(ScheduledEvent::Deferred {
                generation,
                target,
                action,
            });
        });

        debug!(?action, target, generation, "Deferred action scheduled");
        let abort = task.abort_handle();
        self.pending.push(abort.clone());
        ScheduledAction { target, abort }
    }

    /// Abort every pending action and invalidate in-flight ones
    pub fn cancel_all(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let pending = self.pending.len();
        for handle in self.pending.drain(..) {
            handle.abort();
        }
        if pending > 0 {
            info!(pending, generation, "Deferred actions cancelled");
        }
    }

    /// Number of actions that have not completed yet
    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for DeferredActionScheduler {
    fn drop(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

/// Sleep until shortly before `target`, then spin until the clock reaches it
///
/// Returns `false` if the clock stops first.
async fn wait_until(stopwatch: &Stopwatch, target: RaceTime) -> bool {
    let remaining = target.saturating_sub(stopwatch.time());
    let sleep_for = remaining.saturating_sub(EARLY_WAKE_MS);
    if sleep_for > 0 {
        tokio::time::sleep(Duration::from_millis(sleep_for)).await;
    }
    loop {
        if stopwatch.time() >= target {
            return true;
        }
        if !stopwatch.is_running() {
            return false;
        }
        tokio::task::yield_now().await;
    }
}

/// First multiple of `interval` strictly after `now`
pub fn next_boundary(now: RaceTime, interval: RaceTime) -> RaceTime {
    (now / interval + 1) * interval
}

/// Emits a [`ScheduledEvent::Tick`] at every multiple of the interval while
/// the race clock runs
#[derive(Debug)]
pub struct PeriodicTimeBroadcaster {
    stopwatch: Stopwatch,
    interval: RaceTime,
    events: UnboundedSender<ScheduledEvent>,
}

impl PeriodicTimeBroadcaster {
    /// `interval` must be greater than [`EARLY_WAKE_MS`]
    pub fn new(
        stopwatch: Stopwatch,
        interval: RaceTime,
        events: UnboundedSender<ScheduledEvent>,
    ) -> Self {
        Self {
            stopwatch,
            interval: interval.max(EARLY_WAKE_MS + 1),
            events,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the event receiver is dropped
    pub async fn run(self) {
        info!(interval_ms = self.interval, "Periodic time broadcaster started");
        loop {
            if !self.stopwatch.is_running() {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }

            let boundary = next_boundary(self.stopwatch.time(), self.interval);
            if !wait_until(&self.stopwatch, boundary).await {
                continue;
            }
            if self.events.send(ScheduledEvent::Tick { boundary }).is_err() {
                break;
            }
        }
        debug!("Periodic time broadcaster stopped");
    }
}
