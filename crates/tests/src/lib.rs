//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 比赛全流程 e2e 测试（RaceHub + ChannelSink，无需网络）
//! - 配置文件加载

#[cfg(test)]
mod contract_tests {
    use contracts::{Message, MessageType, RaceState};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_wire_snapshot() {
        let json = Message::command(RaceState::Running).to_json().unwrap();
        assert_eq!(json, r#"{"type":"COMMAND","state":"RUNNING"}"#);

        let message =
            Message::from_json(r#"{"type":"FRAME","serial":5,"frame":2,"rssi":-40}"#).unwrap();
        assert_eq!(message.kind, MessageType::Frame);
        assert_eq!(message.serial, Some(5));
        assert_eq!(message.frame, Some(2));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{LapsConfig, Message, MessageType, RaceConfig, RaceState};
    use dispatcher::{ChannelSink, RaceHub, SessionId};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::{sleep, timeout};

    fn config() -> RaceConfig {
        RaceConfig {
            laps: LapsConfig {
                safe_interval_ms: 50,
                circuit: vec![1, 2, 3],
                pit_stop_duration_ms: 200,
                time_send_interval_ms: 60_000,
            },
            ..RaceConfig::default()
        }
    }

    /// Next envelope, failing the test after `wait`
    async fn recv_within(rx: &mut UnboundedReceiver<Message>, wait: Duration) -> Message {
        timeout(wait, rx.recv())
            .await
            .expect("timed out waiting for envelope")
            .expect("session closed")
    }

    async fn recv(rx: &mut UnboundedReceiver<Message>) -> Message {
        recv_within(rx, Duration::from_secs(1)).await
    }

    /// Skip envelopes until one of `kind` arrives
    async fn recv_kind(rx: &mut UnboundedReceiver<Message>, kind: MessageType) -> Message {
        loop {
            let message = recv(rx).await;
            if message.kind == kind {
                return message;
            }
        }
    }

    fn connect(hub: &RaceHub, name: &str) -> (SessionId, UnboundedReceiver<Message>) {
        let (sink, rx) = ChannelSink::new(name);
        (hub.connect(sink), rx)
    }

    fn robot_init(serial: u32, name: &str) -> Message {
        Message {
            name: Some(name.to_string()),
            ..Message::for_robot(MessageType::RobotInit, serial)
        }
    }

    fn frame(serial: u32, frame: u32) -> Message {
        Message {
            frame: Some(frame),
            ..Message::for_robot(MessageType::Frame, serial)
        }
    }

    async fn start_race(hub: &RaceHub, id: SessionId) {
        hub.handle_message(id, &Message::command(RaceState::Steady));
        hub.handle_message(id, &Message::command(RaceState::Running));
    }

    #[tokio::test]
    async fn test_e2e_full_lap_over_hub() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (console, mut console_rx) = connect(hub, "console");
        let (sensor, mut sensor_rx) = connect(hub, "sensor");

        assert_eq!(recv(&mut console_rx).await, Message::state(RaceState::Ready));
        assert_eq!(recv(&mut console_rx).await.kind, MessageType::Time);

        hub.handle_message(console, &robot_init(1, "Alpha"));
        let lap = recv_kind(&mut console_rx, MessageType::Lap).await;
        assert_eq!(lap.name.as_deref(), Some("Alpha"));
        assert_eq!(lap.place, Some(1));

        start_race(hub, console).await;
        assert_eq!(
            recv_kind(&mut console_rx, MessageType::State).await,
            Message::state(RaceState::Steady)
        );
        assert_eq!(
            recv_kind(&mut console_rx, MessageType::State).await,
            Message::state(RaceState::Running)
        );

        for gate in [1, 2, 3, 1] {
            hub.handle_message(sensor, &frame(1, gate));
            sleep(Duration::from_millis(80)).await;
        }

        let lap = recv_kind(&mut console_rx, MessageType::Lap).await;
        assert_eq!(lap.serial, Some(1));
        assert_eq!(lap.laps, Some(1));
        assert_eq!(lap.last_lap_time, lap.best_lap_time);
        assert!(lap.last_lap_time.unwrap() >= 150);

        // The sensor saw the same broadcast plus its FRAME acks
        let acked = recv_kind(&mut sensor_rx, MessageType::Frame).await;
        assert_eq!(acked, Message::new(MessageType::Frame));
        assert_eq!(recv_kind(&mut sensor_rx, MessageType::Lap).await.laps, Some(1));

        assert_eq!(hub.robots()[0].laps, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_time_limit_finishes_at_exact_time() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (console, mut rx) = connect(hub, "console");

        hub.handle_message(
            console,
            &Message {
                race_time_limit: Some(3),
                ..Message::new(MessageType::Time)
            },
        );
        assert_eq!(recv_kind(&mut rx, MessageType::Time).await.time, Some(0));
        let limit = recv_kind(&mut rx, MessageType::Time).await;
        assert_eq!(limit.race_time_limit, Some(3));

        start_race(hub, console).await;
        assert_eq!(
            recv_kind(&mut rx, MessageType::State).await,
            Message::state(RaceState::Steady)
        );
        assert_eq!(
            recv_kind(&mut rx, MessageType::State).await,
            Message::state(RaceState::Running)
        );
        assert_eq!(recv(&mut rx).await.kind, MessageType::Time);

        let finish = recv_within(&mut rx, Duration::from_secs(5)).await;
        assert_eq!(finish, Message::state(RaceState::Finish));
        assert_eq!(recv(&mut rx).await, Message::time(3000, 3));
        assert_eq!(hub.state(), RaceState::Finish);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_periodic_time_on_boundaries() {
        let mut config = config();
        config.laps.time_send_interval_ms = 100;
        let handle = RaceHub::start(&config);
        let hub = handle.hub();
        let (console, mut rx) = connect(hub, "console");

        start_race(hub, console).await;
        recv_kind(&mut rx, MessageType::State).await;
        assert_eq!(
            recv_kind(&mut rx, MessageType::State).await,
            Message::state(RaceState::Running)
        );
        // TIME of the RUNNING command itself
        assert_eq!(recv(&mut rx).await.kind, MessageType::Time);

        let mut ticks = Vec::new();
        while ticks.len() < 3 {
            ticks.extend(recv_kind(&mut rx, MessageType::Time).await.time);
        }
        assert_eq!(ticks[0], 100);
        assert!(ticks.iter().all(|t| t % 100 == 0), "ticks {ticks:?}");
        assert!(ticks.windows(2).all(|w| w[1] == w[0] + 100), "ticks {ticks:?}");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_errors_reach_sender_only() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (a, mut rx_a) = connect(hub, "a");
        let (_b, mut rx_b) = connect(hub, "b");
        for rx in [&mut rx_a, &mut rx_b] {
            recv(rx).await;
            recv(rx).await;
        }

        hub.handle_text(a, "not json at all");
        assert_eq!(recv(&mut rx_a).await.kind, MessageType::Error);

        hub.handle_message(a, &Message::for_robot(MessageType::RobotRemove, 99));
        let error = recv(&mut rx_a).await;
        assert_eq!(error.kind, MessageType::Error);
        assert_eq!(error.message.as_deref(), Some("cannot find robot by serial 99"));

        hub.handle_message(a, &Message::command(RaceState::Finish));
        let error = recv(&mut rx_a).await;
        assert_eq!(
            error.message.as_deref(),
            Some("wrong current state to apply command: [READY]->[FINISH]")
        );

        sleep(Duration::from_millis(50)).await;
        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.state(), RaceState::Ready);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_pit_stop_and_narration() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (console, mut rx) = connect(hub, "console");

        hub.handle_message(console, &robot_init(4, "Delta"));
        start_race(hub, console).await;
        hub.handle_message(console, &Message::for_robot(MessageType::PitStop, 4));

        let pit = recv_kind(&mut rx, MessageType::Lap).await;
        assert!(pit.pit_stop_finish_time.is_none());
        let pit = recv_kind(&mut rx, MessageType::Lap).await;
        assert!(pit.pit_stop_finish_time.unwrap() >= 200);

        let done = recv_kind(&mut rx, MessageType::PitStopFinish).await;
        assert_eq!(done.serial, Some(4));
        assert!(hub.robots()[0].pit_stop_finish_time.is_none());

        let narrated: Vec<_> = hub.recent().drain().into_iter().map(|m| m.kind).collect();
        assert!(narrated.contains(&MessageType::PitStop));
        assert!(narrated.contains(&MessageType::PitStopFinish));
        assert!(!narrated.contains(&MessageType::Frame));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_ready_resets_race() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (console, _rx) = connect(hub, "console");

        hub.handle_message(console, &robot_init(1, "A"));
        hub.handle_message(console, &robot_init(2, "B"));
        start_race(hub, console).await;
        hub.handle_message(
            console,
            &Message {
                laps: Some(1),
                ..Message::for_robot(MessageType::LapMan, 2)
            },
        );
        assert_eq!(hub.robots()[0].serial, 2);

        hub.handle_message(console, &Message::command(RaceState::Finish));
        hub.handle_message(console, &Message::command(RaceState::Ready));

        let robots = hub.robots();
        assert!(robots.iter().all(|r| r.laps == 0 && r.time == 0));
        assert_eq!(robots.iter().map(|r| r.place).collect::<Vec<_>>(), vec![1, 2]);

        let summary = hub.summary();
        assert_eq!(summary.laps_credited, 1);
        assert_eq!(summary.messages_failed, 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_rollback_below_zero_keeps_ranking() {
        let handle = RaceHub::start(&config());
        let hub = handle.hub();
        let (console, mut rx) = connect(hub, "console");

        for serial in [1, 2, 3] {
            hub.handle_message(console, &robot_init(serial, "R"));
        }
        start_race(hub, console).await;
        hub.handle_message(
            console,
            &Message {
                laps: Some(1),
                ..Message::for_robot(MessageType::LapMan, 3)
            },
        );
        hub.handle_message(
            console,
            &Message {
                laps: Some(-1),
                ..Message::for_robot(MessageType::LapMan, 1)
            },
        );

        let robots = hub.robots();
        let serials: Vec<_> = robots.iter().map(|r| r.serial).collect();
        assert_eq!(serials, vec![3, 2, 1]);
        assert!(robots
            .windows(2)
            .all(|w| race_engine::compare(&w[0], &w[1]).is_lt()));
        assert!(robots.iter().zip(1..).all(|(r, place)| r.place == place));

        let rolled_back = robots.iter().find(|r| r.serial == 1).unwrap();
        assert_eq!((rolled_back.laps, rolled_back.time), (-1, 0));

        let last = loop {
            let message = recv(&mut rx).await;
            if message.kind == MessageType::Lap && message.serial == Some(1) && message.laps == Some(-1) {
                break message;
            }
        };
        assert_eq!(last.place, Some(3));

        handle.shutdown().await;
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use config_loader::ConfigLoader;
    use dispatcher::RaceHub;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_loaded_config_drives_hub() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[laps]\ncircuit = [10, 20, 30]\nsafe_interval_ms = 10\n\n[server]\nrecent_broadcasts = 2"
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.laps.circuit, vec![10, 20, 30]);

        let (hub, _events) = RaceHub::new(&config);
        assert_eq!(hub.state(), contracts::RaceState::Ready);
        assert!(hub.recent().is_empty());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[laps]\ntime_send_interval_ms = 5").unwrap();

        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("time_send_interval_ms"));
    }
}
