//! 比赛指标收集模块
//!
//! 记录帧判定、消息处理、圈数和会话分发的运行指标。

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// 记录一次帧判定结果
///
/// `outcome` 为判定类型的线上名称（`FRAME`、`LAP`、`ERROR` 等）。
pub fn record_frame_outcome(outcome: &str) {
    counter!(
        "lapscounter_frame_outcomes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一条入站消息的处理结果
pub fn record_message_handled(kind: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "lapscounter_messages_handled_total",
        "type" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录计圈 (`delta` 为 +1 或 -1)
///
/// 正向圈同时记录单圈用时。
pub fn record_lap(delta: i32, lap_time_ms: Option<u64>) {
    if delta >= 0 {
        counter!("lapscounter_laps_credited_total").increment(1);
    } else {
        counter!("lapscounter_laps_rolled_back_total").increment(1);
    }
    if let Some(lap_time) = lap_time_ms {
        histogram!("lapscounter_lap_time_ms").record(lap_time as f64);
    }
}

/// 记录一次广播的扇出规模
pub fn record_broadcast(messages: usize, sessions: usize) {
    counter!("lapscounter_broadcasts_total").increment(1);
    histogram!("lapscounter_broadcast_messages").record(messages as f64);
    histogram!("lapscounter_broadcast_fanout").record(sessions as f64);
}

/// 记录当前连接会话数
pub fn record_sessions(count: usize) {
    gauge!("lapscounter_sessions_connected").set(count as f64);
}

/// 记录会话出站队列丢弃
pub fn record_session_drop(session: &str) {
    counter!(
        "lapscounter_session_dropped_total",
        "session" => session.to_string()
    )
    .increment(1);
}

/// 记录比赛状态切换
pub fn record_state(state: &str) {
    counter!(
        "lapscounter_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// 比赛指标聚合器
///
/// 在内存中聚合指标，便于在进程退出时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RaceMetricsAggregator {
    /// 处理的入站消息数
    pub messages_handled: u64,

    /// 处理失败（回复 ERROR）的消息数
    pub messages_failed: u64,

    /// 正向计圈数
    pub laps_credited: u64,

    /// 回退圈数
    pub laps_rolled_back: u64,

    /// 单圈用时统计（毫秒）
    pub lap_time_stats: RunningStats,

    /// 各判定类型计数
    pub frame_outcomes: HashMap<String, u64>,
}

impl RaceMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条入站消息
    pub fn message(&mut self, success: bool) {
        self.messages_handled += 1;
        if !success {
            self.messages_failed += 1;
        }
    }

    /// 记录一次帧判定
    pub fn frame(&mut self, outcome: &str) {
        *self.frame_outcomes.entry(outcome.to_string()).or_insert(0) += 1;
    }

    /// 记录计圈
    pub fn lap(&mut self, delta: i32, lap_time_ms: Option<u64>) {
        if delta >= 0 {
            self.laps_credited += 1;
        } else {
            self.laps_rolled_back += 1;
        }
        if let Some(lap_time) = lap_time_ms {
            self.lap_time_stats.push(lap_time as f64);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            messages_handled: self.messages_handled,
            messages_failed: self.messages_failed,
            failure_rate: if self.messages_handled > 0 {
                self.messages_failed as f64 / self.messages_handled as f64 * 100.0
            } else {
                0.0
            },
            laps_credited: self.laps_credited,
            laps_rolled_back: self.laps_rolled_back,
            lap_time_ms: StatsSummary::from(&self.lap_time_stats),
            frame_outcomes: self.frame_outcomes.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub messages_handled: u64,
    pub messages_failed: u64,
    pub failure_rate: f64,
    pub laps_credited: u64,
    pub laps_rolled_back: u64,
    pub lap_time_ms: StatsSummary,
    pub frame_outcomes: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Race Metrics Summary ===")?;
        writeln!(
            f,
            "Messages handled: {} (failed {}, {:.2}%)",
            self.messages_handled, self.messages_failed, self.failure_rate
        )?;
        writeln!(
            f,
            "Laps: +{} / -{}",
            self.laps_credited, self.laps_rolled_back
        )?;
        writeln!(f, "Lap time (ms): {}", self.lap_time_ms)?;

        if !self.frame_outcomes.is_empty() {
            writeln!(f, "Frame outcomes:")?;
            let mut outcomes: Vec<_> = self.frame_outcomes.iter().collect();
            outcomes.sort();
            for (outcome, count) in outcomes {
                writeln!(f, "  {}: {}", outcome, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.0}, max={:.0}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for lap in [3000.0, 3200.0, 2800.0, 3400.0, 2600.0] {
            stats.push(lap);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3000.0).abs() < 1e-9);
        assert!((stats.min() - 2600.0).abs() < 1e-9);
        assert!((stats.max() - 3400.0).abs() < 1e-9);
        assert!((stats.variance() - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = RaceMetricsAggregator::new();

        aggregator.message(true);
        aggregator.message(false);
        aggregator.frame("FRAME");
        aggregator.frame("FRAME");
        aggregator.frame("LAP");
        aggregator.lap(1, Some(3000));
        aggregator.lap(-1, None);

        assert_eq!(aggregator.messages_handled, 2);
        assert_eq!(aggregator.messages_failed, 1);
        assert_eq!(aggregator.laps_credited, 1);
        assert_eq!(aggregator.laps_rolled_back, 1);
        assert_eq!(aggregator.frame_outcomes.get("FRAME"), Some(&2));
        assert_eq!(aggregator.lap_time_stats.count(), 1);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = RaceMetricsAggregator::new();
        for _ in 0..20 {
            aggregator.message(true);
        }
        aggregator.message(false);
        aggregator.frame("WRONG_FRAME");

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Messages handled: 21"));
        assert!(output.contains("4.76%"));
        assert!(output.contains("WRONG_FRAME: 1"));
        assert!(output.contains("Lap time (ms): N/A"));
    }

    #[test]
    fn test_reset() {
        let mut aggregator = RaceMetricsAggregator::new();
        aggregator.lap(1, Some(1000));
        aggregator.reset();
        assert_eq!(aggregator.laps_credited, 0);
        assert_eq!(aggregator.lap_time_stats.count(), 0);
    }
}
