//! # Dispatcher
//!
//! 比赛网关模块。
//!
//! 负责：
//! - 接受 WebSocket 客户端，每个会话独立写队列
//! - 在比赛锁内应用消息与定时事件，按产生顺序广播
//! - 隔离慢客户端，不阻塞比赛主链路

pub mod error;
pub mod hub;
pub mod metrics;
pub mod recent;
pub mod registry;
pub mod server;
pub mod session;
pub mod sinks;

pub use error::DispatcherError;
pub use hub::{HubHandle, RaceHub};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use recent::RecentBroadcasts;
pub use registry::SessionRegistry;
pub use server::{router, serve};
pub use session::{SessionHandle, SessionId};
pub use sinks::{ChannelSink, WebSocketSink};
