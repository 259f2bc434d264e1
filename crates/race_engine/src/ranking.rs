//! Live ranking.
//!
//! Ranking is a pure function over a snapshot: it returns the reordered
//! robots with fresh places plus the serials whose place changed.

use std::cmp::Ordering;

use contracts::Serial;

use crate::robot::Robot;

/// Result of [`rank`]
#[derive(Debug, Clone)]
pub struct Ranking {
    /// Robots in rank order, `place` recomputed
    pub robots: Vec<Robot>,
    /// Serials whose place changed, in rank order
    pub changed: Vec<Serial>,
}

/// Laps descending, then time ascending, then registration number ascending
pub fn compare(a: &Robot, b: &Robot) -> Ordering {
    b.laps
        .cmp(&a.laps)
        .then(a.time.cmp(&b.time))
        .then(a.num.cmp(&b.num))
}

pub fn rank(robots: Vec<Robot>) -> Ranking {
    let mut robots = robots;
    robots.sort_by(compare);

    let mut changed = Vec::new();
    for (index, robot) in robots.iter_mut().enumerate() {
        let place = index as u32 + 1;
        if robot.place != place {
            robot.place = place;
            changed.push(robot.serial);
        }
    }

    Ranking { robots, changed }
}
