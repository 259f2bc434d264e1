//! Race controller.
//!
//! The single writer of race-wide state. Every inbound envelope and every
//! timer event goes through [`RaceController::handle`] or
//! [`RaceController::fire`]; the owner serialises those calls behind one lock.
//! Each operation validates first and mutates after, so a failed call leaves
//! the race untouched.

use contracts::{
    DispatchResult, LapsConfig, Message, MessageType, RaceError, RaceState, RaceTime, Serial,
};
use observability::metrics::{record_frame_outcome, record_lap, record_message_handled, record_state};
use observability::RaceMetricsAggregator;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument};

use crate::ranking::rank;
use crate::robot::Robot;
use crate::scheduler::{DeferredAction, DeferredActionScheduler, ScheduledEvent};
use crate::stopwatch::Stopwatch;
use crate::validator::{FrameOutcome, FrameValidator};

#[derive(Debug)]
pub struct RaceController {
    state: RaceState,
    /// Seconds, 0 = unlimited
    race_time_limit: u64,
    stopwatch: Stopwatch,
    /// Always in rank order
    robots: Vec<Robot>,
    validator: FrameValidator,
    scheduler: DeferredActionScheduler,
    pit_stop_duration: RaceTime,
    stats: RaceMetricsAggregator,
}

impl RaceController {
    /// Timer events are delivered to `events`; the receiver must feed them
    /// back through [`fire`](Self::fire).
    pub fn new(config: &LapsConfig, events: UnboundedSender<ScheduledEvent>) -> Self {
        let stopwatch = Stopwatch::new();
        Self {
            state: RaceState::Ready,
            race_time_limit: 0,
            scheduler: DeferredActionScheduler::new(stopwatch.clone(), events),
            stopwatch,
            robots: Vec::new(),
            validator: FrameValidator::from_config(config),
            pit_stop_duration: config.pit_stop_duration_ms,
            stats: RaceMetricsAggregator::new(),
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn race_time_limit(&self) -> u64 {
        self.race_time_limit
    }

    /// Shared race clock
    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    /// Sender the timers deliver into; for additional event sources such as
    /// the periodic broadcaster
    pub fn event_sender(&self) -> UnboundedSender<ScheduledEvent> {
        self.scheduler.events()
    }

    /// Counters accumulated since start
    pub fn stats(&self) -> &RaceMetricsAggregator {
        &self.stats
    }

    /// Robots in rank order
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, serial: Serial) -> Option<&Robot> {
        self.robots.iter().find(|r| r.serial == serial)
    }

    /// Envelopes sent to a session when it connects
    pub fn greeting(&self) -> Vec<Message> {
        vec![self.state_message(), self.time_message()]
    }

    /// Apply one inbound envelope
    #[instrument(level = "debug", name = "race_handle", skip(self, message), fields(kind = %message.kind))]
    pub fn handle(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        let result = match message.kind {
            MessageType::Command => self.command(message),
            MessageType::State => Ok(DispatchResult::single(self.state_message())),
            MessageType::RobotInit => self.robot_init(message),
            MessageType::RobotEdit => self.robot_edit(message),
            MessageType::RobotRemove => self.robot_remove(message),
            MessageType::Time => self.time_request(message),
            MessageType::Laps => Ok(DispatchResult::single_all(self.lap_messages())),
            MessageType::LapMan => self.lap_manual(message),
            MessageType::PitStop => self.pit_stop(message),
            MessageType::Frame => self.frame(message),
            kind => Err(RaceError::Unsupported { kind }),
        };
        record_message_handled(message.kind.as_str(), result.is_ok());
        self.stats.message(result.is_ok());
        result
    }

    /// Apply a timer event
    ///
    /// Events from a cancelled generation, or arriving after the race left
    /// the state they were meant for, produce nothing.
    pub fn fire(&mut self, event: ScheduledEvent) -> Result<DispatchResult, RaceError> {
        match event {
            ScheduledEvent::Deferred {
                generation,
                target,
                action,
            } => {
                if generation != self.scheduler.generation() {
                    debug!(?action, generation, "Ignoring stale deferred action");
                    return Ok(DispatchResult::empty());
                }
                match action {
                    DeferredAction::AutoFinish => self.auto_finish(target),
                    DeferredAction::PitStopFinish { serial } => Ok(self.pit_stop_finish(serial)),
                }
            }
            ScheduledEvent::Tick { boundary } => {
                if self.state != RaceState::Running {
                    return Ok(DispatchResult::empty());
                }
                debug!(time = boundary, "Send time");
                Ok(DispatchResult::broadcast(Message::time(
                    boundary,
                    self.race_time_limit,
                )))
            }
        }
    }

    fn command(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        let requested = message
            .state
            .ok_or(RaceError::MissingField { field: "state" })?;
        if requested == self.state {
            return Err(RaceError::StateAlreadySet { state: requested });
        }
        if requested != self.state.successor() {
            return Err(RaceError::WrongTransition {
                from: self.state,
                to: requested,
            });
        }

        let finish_at = match requested {
            RaceState::Running => finish_target(self.race_time_limit)?,
            _ => None,
        };

        info!(from = %self.state, to = %requested, "Race state changed");
        self.state = requested;
        record_state(requested.as_str());

        let mut messages = vec![self.state_message()];
        match requested {
            RaceState::Ready => {
                self.scheduler.cancel_all();
                self.stopwatch.reset();
                self.robots.iter_mut().for_each(Robot::reset);
                self.validator.reset_all();
                self.rerank();
                messages.extend(self.lap_messages());
            }
            RaceState::Steady => {}
            RaceState::Running => {
                self.stopwatch.start();
                if let Some(target) = finish_at {
                    info!(target_ms = target, "Scheduling finish by time limit");
                    self.scheduler.schedule_at(target, DeferredAction::AutoFinish);
                }
            }
            RaceState::Finish => {
                self.stopwatch.stop();
                self.scheduler.cancel_all();
            }
        }
        messages.push(self.time_message());

        Ok(DispatchResult::broadcast_all(messages))
    }

    fn robot_init(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        let serial = require_serial(message)?;
        if let Some(robot) = self.robot(serial) {
            info!(serial, name = %robot.name, "Reconnect robot");
            return Ok(DispatchResult::broadcast(robot.to_lap_message()));
        }

        let num = self.robots.iter().map(|r| r.num).max().unwrap_or(0) + 1;
        let place = self.robots.len() as u32 + 1;
        let robot = Robot::new(serial, message.name.clone(), num, place);
        info!(serial, name = %robot.name, num, "Connect new robot");

        self.robots.push(robot);
        self.validator.register(serial);

        let mut serials = vec![serial];
        serials.extend(self.rerank().into_iter().filter(|&s| s != serial));
        debug!(robots = self.robots.len(), "Connected robots");
        Ok(DispatchResult::broadcast_all(self.lap_messages_for(&serials)))
    }

    fn robot_edit(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        let serial = require_serial(message)?;
        let robot = self.robot_mut(serial)?;
        if let Some(name) = &message.name {
            info!(serial, from = %robot.name, to = %name, "Edit robot");
            robot.name = name.clone();
        }
        Ok(DispatchResult::broadcast(robot.to_lap_message()))
    }

    fn robot_remove(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        let serial = require_serial(message)?;
        let index = self.index_of(serial)?;

        let robot = self.robots.remove(index);
        self.validator.unregister(serial);
        info!(serial, name = %robot.name, "Remove robot");

        let changed = self.rerank();
        let mut messages = vec![Message::for_robot(MessageType::RobotRemove, serial)];
        messages.extend(self.lap_messages_for(&changed));
        Ok(DispatchResult::broadcast_all(messages))
    }

    fn time_request(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        match message.race_time_limit {
            Some(limit) if self.state != RaceState::Running => {
                finish_target(limit)?;
                info!(limit_s = limit, "Race time limit set");
                self.race_time_limit = limit;
                Ok(DispatchResult::broadcast(self.time_message()))
            }
            _ => Ok(DispatchResult::single(self.time_message())),
        }
    }

    fn lap_manual(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        self.require_running("lap manual")?;
        let laps = message.laps.ok_or(RaceError::MissingField { field: "laps" })?;
        let serial = require_serial(message)?;
        self.index_of(serial)?;

        info!(serial, laps, "Manual lap correction");
        let serials = if laps > 0 {
            self.inc_laps(serial, self.stopwatch.time())
        } else {
            self.dec_laps(serial)
        };
        Ok(DispatchResult::broadcast_all(self.lap_messages_for(&serials)))
    }

    fn pit_stop(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        self.require_running("pit stop")?;
        let serial = require_serial(message)?;
        let index = self.index_of(serial)?;

        let action = self
            .scheduler
            .schedule_once(self.pit_stop_duration, DeferredAction::PitStopFinish { serial });
        let robot = &mut self.robots[index];
        robot.pit_stop_finish_time = Some(action.target());
        info!(serial, until = action.target(), "Pit stop started");

        Ok(DispatchResult::broadcast_all(vec![
            Message::for_robot(MessageType::PitStop, serial),
            robot.to_lap_message(),
        ]))
    }

    fn frame(&mut self, message: &Message) -> Result<DispatchResult, RaceError> {
        if self.state != RaceState::Running {
            debug!("Frame ignored: state is not running");
            return Ok(DispatchResult::empty());
        }
        let Some(frame) = message.frame else {
            debug!("Frame is not defined");
            return Ok(DispatchResult::empty());
        };
        let serial = require_serial(message)?;
        self.index_of(serial)?;

        let race_time = self.stopwatch.time();
        let outcome = self.validator.check(serial, frame, race_time);
        record_frame_outcome(outcome.as_str());
        self.stats.frame(outcome.as_str());

        let result = match outcome {
            FrameOutcome::Lap => {
                let serials = self.inc_laps(serial, race_time);
                DispatchResult::broadcast_all(self.lap_messages_for(&serials))
            }
            FrameOutcome::LapMinus => {
                let serials = self.dec_laps(serial);
                DispatchResult::broadcast_all(self.lap_messages_for(&serials))
            }
            FrameOutcome::Frame => {
                if self.validator.is_start_frame(frame) {
                    if let Ok(index) = self.index_of(serial) {
                        self.robots[index].current_lap_start_time = race_time;
                    }
                }
                DispatchResult::single(Message::new(MessageType::Frame))
            }
            _ => DispatchResult::empty(),
        };
        Ok(result)
    }

    fn auto_finish(&mut self, target: RaceTime) -> Result<DispatchResult, RaceError> {
        if self.state != RaceState::Running {
            debug!("Auto finish ignored: state is not running");
            return Ok(DispatchResult::empty());
        }
        self.stopwatch.stop_at(target);
        let result = self.handle(&Message::command(RaceState::Finish))?;
        info!(time = target, "Race is finished by time limit");
        Ok(result)
    }

    fn pit_stop_finish(&mut self, serial: Serial) -> DispatchResult {
        let Ok(index) = self.index_of(serial) else {
            debug!(serial, "Pit stop finished for removed robot");
            return DispatchResult::empty();
        };
        self.robots[index].pit_stop_finish_time = None;
        info!(serial, "Pit stop is finished");
        DispatchResult::broadcast(Message::for_robot(MessageType::PitStopFinish, serial))
    }

    /// Credit a lap; returns the serials to report
    fn inc_laps(&mut self, serial: Serial, race_time: RaceTime) -> Vec<Serial> {
        if let Ok(index) = self.index_of(serial) {
            let robot = &mut self.robots[index];
            robot.inc_laps(race_time);
            record_lap(1, robot.last_lap_time);
            self.stats.lap(1, robot.last_lap_time);
            info!(serial, laps = robot.laps, time = race_time, "Lap");
        }
        self.affected_by(serial)
    }

    /// Roll back a lap; returns the serials to report
    fn dec_laps(&mut self, serial: Serial) -> Vec<Serial> {
        if let Ok(index) = self.index_of(serial) {
            let robot = &mut self.robots[index];
            robot.dec_laps();
            record_lap(-1, None);
            self.stats.lap(-1, None);
            info!(serial, laps = robot.laps, "Lap rolled back");
        }
        self.affected_by(serial)
    }

    /// Re-rank after `serial` changed; falls back to `serial` when no place moved
    fn affected_by(&mut self, serial: Serial) -> Vec<Serial> {
        let changed = self.rerank();
        if changed.is_empty() {
            vec![serial]
        } else {
            changed
        }
    }

    /// Returns the serials whose place changed
    fn rerank(&mut self) -> Vec<Serial> {
        let ranking = rank(std::mem::take(&mut self.robots));
        self.robots = ranking.robots;
        ranking.changed
    }

    fn require_running(&self, operation: &'static str) -> Result<(), RaceError> {
        if self.state == RaceState::Running {
            Ok(())
        } else {
            info!("{operation} ignored: state is not running");
            Err(RaceError::NotRunning { operation })
        }
    }

    fn index_of(&self, serial: Serial) -> Result<usize, RaceError> {
        self.robots
            .iter()
            .position(|r| r.serial == serial)
            .ok_or(RaceError::UnknownRobot { serial })
    }

    fn robot_mut(&mut self, serial: Serial) -> Result<&mut Robot, RaceError> {
        let index = self.index_of(serial)?;
        Ok(&mut self.robots[index])
    }

    fn state_message(&self) -> Message {
        Message::state(self.state)
    }

    fn time_message(&self) -> Message {
        Message::time(self.stopwatch.time(), self.race_time_limit)
    }

    fn lap_messages(&self) -> Vec<Message> {
        self.robots.iter().map(Robot::to_lap_message).collect()
    }

    fn lap_messages_for(&self, serials: &[Serial]) -> Vec<Message> {
        serials
            .iter()
            .filter_map(|&serial| self.robot(serial))
            .map(Robot::to_lap_message)
            .collect()
    }
}

/// Race time of the automatic finish for `limit` seconds; `None` when unlimited
fn finish_target(limit: u64) -> Result<Option<RaceTime>, RaceError> {
    if limit == 0 {
        return Ok(None);
    }
    limit
        .checked_mul(1000)
        .map(Some)
        .ok_or(RaceError::InvalidTimeLimit { limit })
}

fn require_serial(message: &Message) -> Result<Serial, RaceError> {
    message.serial.ok_or(RaceError::MissingField { field: "serial" })
}
