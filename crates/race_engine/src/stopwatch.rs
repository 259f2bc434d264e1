//! Monotonic race clock with pause/resume.
//!
//! The handle is cheap to clone; all clones observe the same clock, so the
//! scheduler can poll it without holding the race lock.

use std::sync::Arc;
use std::time::Instant;

use contracts::RaceTime;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct ClockState {
    /// Set while running
    origin: Option<Instant>,
    /// Elapsed time accumulated before `origin`
    accumulated: RaceTime,
}

impl ClockState {
    fn elapsed(&self) -> RaceTime {
        match self.origin {
            Some(origin) => self.accumulated + origin.elapsed().as_millis() as RaceTime,
            None => self.accumulated,
        }
    }
}

/// Shared race stopwatch
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    state: Arc<Mutex<ClockState>>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and begin counting from zero
    pub fn start(&self) {
        let mut state = self.state.lock();
        state.accumulated = 0;
        state.origin = Some(Instant::now());
    }

    /// Freeze the elapsed time
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.accumulated = state.elapsed();
        state.origin = None;
    }

    /// Freeze at an exact elapsed value
    ///
    /// Used by deferred actions that already waited for `time` to pass, so the
    /// frozen value lands on the target instead of a millisecond later.
    pub fn stop_at(&self, time: RaceTime) {
        let mut state = self.state.lock();
        state.accumulated = time.min(state.elapsed());
        state.origin = None;
    }

    /// Resume counting, preserving the elapsed time
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if state.origin.is_none() {
            state.origin = Some(Instant::now());
        }
    }

    /// Stop and zero the clock
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.accumulated = 0;
        state.origin = None;
    }

    /// Elapsed race time in milliseconds
    pub fn time(&self) -> RaceTime {
        self.state.lock().elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().origin.is_some()
    }
}
