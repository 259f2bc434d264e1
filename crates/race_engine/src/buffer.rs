//! Per-robot gate-crossing buffer.
//!
//! Holds the gates crossed since the last lap boundary, in crossing order.
//! Backing over an already-crossed gate truncates instead of appending, so
//! the buffer reflects net forward progress on the current lap.

use contracts::{FrameId, RaceTime};

/// Crossings of one robot since its last lap boundary
#[derive(Debug, Clone, Default)]
pub struct CrossingBuffer {
    frames: Vec<FrameId>,
    last_frame_time: RaceTime,
}

impl CrossingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently placed gate
    #[inline]
    pub fn last_frame(&self) -> Option<FrameId> {
        self.frames.last().copied()
    }

    /// Race time of the most recently accepted crossing
    #[inline]
    pub fn last_frame_time(&self) -> RaceTime {
        self.last_frame_time
    }

    #[inline]
    pub fn frames(&self) -> &[FrameId] {
        &self.frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Record a crossing
    ///
    /// A non-finish gate already present truncates the buffer back to (and
    /// including) its first occurrence; anything else is appended.
    pub fn place(&mut self, frame: FrameId, time: RaceTime, is_finish: bool) {
        self.last_frame_time = time;
        if !is_finish {
            if let Some(pos) = self.frames.iter().position(|&f| f == frame) {
                self.frames.truncate(pos + 1);
                return;
            }
        }
        self.frames.push(frame);
    }

    /// Start a fresh lap seeded with the finish crossing
    pub fn restart_lap(&mut self, finish: FrameId, time: RaceTime) {
        self.frames.clear();
        self.place(finish, time, true);
    }

    /// Whether `search` appears in the buffer in order, not necessarily contiguous
    ///
    /// A buffer with fewer than two crossings never holds a lap.
    pub fn contains_in_order(&self, search: &[FrameId]) -> bool {
        if self.frames.len() < 2 {
            return false;
        }
        let mut crossed = self.frames.iter();
        search
            .iter()
            .all(|wanted| crossed.by_ref().any(|frame| frame == wanted))
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.last_frame_time = 0;
    }
}
