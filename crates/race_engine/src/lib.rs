//! # Race Engine
//!
//! 比赛核心：计时、过门判定、排名与定时动作。
//!
//! 负责：
//! - 单调比赛时钟 (`Stopwatch`)
//! - 逐机器人过门序列判定 (`FrameValidator`)
//! - 比赛状态机、机器人注册与排名 (`RaceController`)
//! - 可取消的单次定时动作与对齐的周期 TIME 广播
//!
//! ## 使用示例
//!
//! ```ignore
//! use race_engine::{PeriodicTimeBroadcaster, RaceController};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut controller = RaceController::new(&config.laps, tx.clone());
//! PeriodicTimeBroadcaster::new(
//!     controller.stopwatch().clone(),
//!     config.laps.time_send_interval_ms,
//!     tx,
//! )
//! .spawn();
//!
//! let result = controller.handle(&message)?;
//! while let Some(event) = rx.recv().await {
//!     let result = controller.fire(event)?;
//! }
//! ```

mod buffer;
mod controller;
mod ranking;
mod robot;
mod scheduler;
mod stopwatch;
mod validator;

pub use buffer::CrossingBuffer;
pub use controller::RaceController;
pub use ranking::{compare, rank, Ranking};
pub use robot::Robot;
pub use scheduler::{
    next_boundary, DeferredAction, DeferredActionScheduler, PeriodicTimeBroadcaster,
    ScheduledAction, ScheduledEvent, EARLY_WAKE_MS,
};
pub use stopwatch::Stopwatch;
pub use validator::{FrameOutcome, FrameValidator};
