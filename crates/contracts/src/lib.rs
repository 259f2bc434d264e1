//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Race time is milliseconds (`u64`) read from the single server-side stopwatch
//! - Sensor hardware clocks are never trusted

mod config;
mod dispatch;
mod error;
mod message;
mod sink;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use message::*;
pub use sink::{LocalSessionSink, SessionSink};
