//! Robot registry entry and lap bookkeeping.

use contracts::{Message, MessageType, RaceTime, Serial};

/// One registered robot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Robot {
    pub serial: Serial,
    pub name: String,
    /// Registration sequence, never reused
    pub num: u32,
    /// 1-based rank
    pub place: u32,
    pub laps: i32,
    /// Race time of the most recent counted lap boundary
    pub time: RaceTime,
    lap_timestamps: Vec<RaceTime>,
    pub current_lap_start_time: RaceTime,
    pub last_lap_time: Option<RaceTime>,
    pub best_lap_time: Option<RaceTime>,
    /// Present only while serving a pit stop
    pub pit_stop_finish_time: Option<RaceTime>,
}

impl Robot {
    pub fn new(serial: Serial, name: Option<String>, num: u32, place: u32) -> Self {
        Self {
            serial,
            name: name.unwrap_or_else(|| format!("Robot {serial}")),
            num,
            place,
            laps: 0,
            time: 0,
            lap_timestamps: Vec::new(),
            current_lap_start_time: 0,
            last_lap_time: None,
            best_lap_time: None,
            pit_stop_finish_time: None,
        }
    }

    /// Credit a forward lap finished at `race_time`
    pub fn inc_laps(&mut self, race_time: RaceTime) {
        self.laps += 1;
        if self.laps > 0 {
            self.lap_timestamps.push(race_time);
            self.time = race_time;
        }
        let lap_time = race_time.saturating_sub(self.current_lap_start_time);
        self.last_lap_time = Some(lap_time);
        self.current_lap_start_time = race_time;
        self.best_lap_time = Some(self.best_lap_time.map_or(lap_time, |best| best.min(lap_time)));
    }

    /// Roll back one lap
    ///
    /// Last and best lap times are left as they were.
    pub fn dec_laps(&mut self) {
        self.laps -= 1;
        self.lap_timestamps.pop();
        self.time = self.lap_timestamps.last().copied().unwrap_or(0);
    }

    /// Clear every lap and time field
    pub fn reset(&mut self) {
        self.laps = 0;
        self.time = 0;
        self.lap_timestamps.clear();
        self.current_lap_start_time = 0;
        self.last_lap_time = None;
        self.best_lap_time = None;
        self.pit_stop_finish_time = None;
    }

    pub fn lap_timestamps(&self) -> &[RaceTime] {
        &self.lap_timestamps
    }

    /// `LAP` envelope describing the robot
    pub fn to_lap_message(&self) -> Message {
        Message {
            name: Some(self.name.clone()),
            num: Some(self.num),
            laps: Some(self.laps),
            time: Some(self.time),
            last_lap_time: self.last_lap_time,
            best_lap_time: self.best_lap_time,
            pit_stop_finish_time: self.pit_stop_finish_time,
            place: Some(self.place),
            ..Message::for_robot(MessageType::Lap, self.serial)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        let robot = Robot::new(42, None, 1, 1);
        assert_eq!(robot.name, "Robot 42");
        assert_eq!(Robot::new(42, Some("Zippy".into()), 1, 1).name, "Zippy");
    }

    #[test]
    fn test_inc_laps_tracks_lap_times() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.inc_laps(3000);
        assert_eq!(robot.laps, 1);
        assert_eq!(robot.time, 3000);
        assert_eq!(robot.last_lap_time, Some(3000));
        assert_eq!(robot.best_lap_time, Some(3000));

        robot.inc_laps(5000);
        assert_eq!(robot.last_lap_time, Some(2000));
        assert_eq!(robot.best_lap_time, Some(2000));

        robot.inc_laps(8000);
        assert_eq!(robot.last_lap_time, Some(3000));
        assert_eq!(robot.best_lap_time, Some(2000));
        assert_eq!(robot.lap_timestamps(), &[3000, 5000, 8000]);
    }

    #[test]
    fn test_lap_starts_at_start_gate() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.current_lap_start_time = 500;
        robot.inc_laps(3000);
        assert_eq!(robot.last_lap_time, Some(2500));
    }

    #[test]
    fn test_dec_laps_below_zero() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.dec_laps();
        assert_eq!(robot.laps, -1);
        assert_eq!(robot.time, 0);
    }

    #[test]
    fn test_inc_from_negative_does_not_record_timestamp() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.dec_laps();
        robot.inc_laps(4000);
        assert_eq!(robot.laps, 0);
        assert_eq!(robot.time, 0);
        assert!(robot.lap_timestamps().is_empty());
    }

    #[test]
    fn test_dec_laps_restores_previous_time_only() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.inc_laps(3000);
        robot.inc_laps(4000);
        robot.dec_laps();
        assert_eq!(robot.laps, 1);
        assert_eq!(robot.time, 3000);
        assert_eq!(robot.last_lap_time, Some(1000));
        assert_eq!(robot.best_lap_time, Some(1000));
    }

    #[test]
    fn test_reset() {
        let mut robot = Robot::new(1, None, 1, 1);
        robot.inc_laps(3000);
        robot.pit_stop_finish_time = Some(9000);
        robot.reset();
        assert_eq!(robot.laps, 0);
        assert_eq!(robot.time, 0);
        assert_eq!(robot.last_lap_time, None);
        assert_eq!(robot.best_lap_time, None);
        assert_eq!(robot.pit_stop_finish_time, None);
        assert!(robot.lap_timestamps().is_empty());
    }

    #[test]
    fn test_lap_message_omits_unset_times() {
        let robot = Robot::new(7, Some("R7".into()), 2, 1);
        let json = robot.to_lap_message().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"LAP","serial":7,"name":"R7","num":2,"laps":0,"time":0,"place":1}"#
        );
    }
}
