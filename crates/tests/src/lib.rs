//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - configuration snapshots
//! - line source -> assembler -> extractor -> writer -> SQLite
//! - transport faults, reconnects and the recovery journal

#[cfg(test)]
mod contract_tests {
    use contracts::{StationConfig, StorageKind, TransportKind, DEFAULT_END_MARKER};

    #[test]
    fn test_empty_config_is_valid() {
        let config = config_loader::ConfigLoader::load_from_str(
            "",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.transport.kind, TransportKind::Device);
        assert_eq!(config.storage.kind, StorageKind::Sqlite);
        assert_eq!(config.framing.end_marker, DEFAULT_END_MARKER);
    }

    #[test]
    fn test_default_config_survives_toml() {
        let toml = config_loader::ConfigLoader::to_toml(&StationConfig::default()).unwrap();
        let back =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(back.transport.path, StationConfig::default().transport.path);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use contracts::{
        LineSource, ReconnectConfig, TransportFault, DEFAULT_END_MARKER as END,
        DEFAULT_START_MARKER as START,
    };
    use framing::{FieldExtractor, FrameAssembler, Markers};
    use ingestion::{
        CaptureWriter, ReplayLineSource, ScriptedLineSource, StreamLineSource, StreamOptions,
        StreamTarget,
    };
    use supervisor::{RunReport, ShutdownReason, Supervisor};
    use tokio::io::AsyncWriteExt;
    use writer::{
        recover_journal, Database, IngestionWriter, MemorySink, RecoveryJournal, SqliteSink,
        StoredReading,
    };

    /// One station console block as printed by the firmware
    fn station_frame(temperature: &str, humidity: &str, motion: &str, rain: &str, soil: &str) -> Vec<String> {
        vec![
            START.to_string(),
            format!("Temperature: {temperature} C"),
            format!("Humidity: {humidity} %"),
            format!("Motion Detected (PIR): {motion}"),
            format!("Rain: {rain}"),
            format!("Soil Moisture: {soil}"),
            END.to_string(),
        ]
    }

    async fn run_into_sqlite<S: LineSource>(source: S, db_path: &Path) -> RunReport {
        let sink = SqliteSink::open(db_path).unwrap();
        Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
        .run(std::future::pending())
        .await
    }

    async fn stored(db_path: &Path) -> Vec<StoredReading> {
        let db = Database::open(db_path).unwrap();
        let mut rows = db.recent_readings(1000).await.unwrap();
        db.shutdown().await.unwrap();
        rows.reverse();
        rows
    }

    /// End-to-end: scripted console output -> Supervisor -> SQLite
    ///
    /// Checks:
    /// 1. one row per complete frame, in order
    /// 2. absent fields stored as NULL
    /// 3. noise outside frames and empty frames store nothing
    #[tokio::test]
    async fn test_e2e_console_to_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("readings.db");

        let source = ScriptedLineSource::from_lines(["Booting station...", "WiFi connected"])
            .lines(station_frame("21.5", "40.0", "NO", "NO", "512"))
            .lines([START, END])
            .lines(station_frame("22.0", "41.5", "YES", "NO", "498"))
            .lines([START, "Rain: YES", END])
            .line("DHT read failed");

        let report = run_into_sqlite(source, &db_path).await;

        assert!(matches!(report.reason, ShutdownReason::EndOfStream));
        assert_eq!(report.stats.frames_closed, 4);
        assert_eq!(report.stats.empty_frames, 1);
        assert_eq!(report.stats.persisted, 3);

        let rows = stored(&db_path).await;
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert!(rows.windows(2).all(|w| w[0].reading.timestamp < w[1].reading.timestamp));

        assert_eq!(rows[0].reading.temperature, Some(21.5));
        assert_eq!(rows[0].reading.soil_moisture, Some(512));
        assert_eq!(rows[1].reading.motion, Some(true));

        let sparse = &rows[2].reading;
        assert_eq!(sparse.rain, Some(true));
        assert_eq!(sparse.temperature, None);
        assert_eq!(sparse.humidity, None);
        assert_eq!(sparse.motion, None);
        assert_eq!(sparse.soil_moisture, None);
        assert_eq!(sparse.raw_text, "Rain: YES");
    }

    /// A captured run replays into the same readings
    #[tokio::test]
    async fn test_e2e_capture_then_replay() {
        let dir = tempfile::tempdir().unwrap();
        let capture_path = dir.path().join("console.log");
        let first_db = dir.path().join("first.db");
        let second_db = dir.path().join("second.db");

        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut source = ScriptedLineSource::default();
        let lines = [
            station_frame("19.0", "55.0", "NO", "YES", "700"),
            station_frame("19.5", "54.0", "NO", "YES", "690"),
        ]
        .concat();
        for (i, text) in lines.iter().enumerate() {
            source = source.line_at(text.clone(), base + chrono::Duration::milliseconds(i as i64));
        }

        let capture = CaptureWriter::open(&capture_path).await.unwrap();
        let sink = SqliteSink::open(&first_db).unwrap();
        Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
        .with_capture(capture)
        .run(std::future::pending())
        .await;

        let replay = ReplayLineSource::open(&capture_path, 1000.0).await.unwrap();
        let report = run_into_sqlite(replay, &second_db).await;
        assert!(matches!(report.reason, ShutdownReason::EndOfStream));

        let first: Vec<_> = stored(&first_db).await.into_iter().map(|r| r.reading).collect();
        let second: Vec<_> = stored(&second_db).await.into_iter().map(|r| r.reading).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    /// A failed write is journaled while later readings still persist;
    /// recovery then stores the journaled reading in SQLite
    #[tokio::test]
    async fn test_e2e_write_failure_journal_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let journal_path = dir.path().join("failed.jsonl");
        let db_path = dir.path().join("readings.db");

        let source = ScriptedLineSource::default()
            .lines(station_frame("10", "30", "NO", "NO", "100"))
            .lines(station_frame("11", "31", "NO", "NO", "101"))
            .lines(station_frame("12", "32", "NO", "NO", "102"));
        let sink = MemorySink::new().failing_attempts([2]);
        let store = sink.store();

        let writer = IngestionWriter::new(sink).with_journal(RecoveryJournal::new(&journal_path));
        let report = Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            writer,
        )
        .run(std::future::pending())
        .await;

        assert_eq!(report.stats.persisted, 2);
        assert_eq!(report.stats.write_failures, 1);
        assert_eq!(report.stats.journaled, 1);
        let temps: Vec<_> = store.rows().iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![Some(10.0), Some(12.0)]);

        let journal = RecoveryJournal::new(&journal_path);
        let mut writer = IngestionWriter::new(SqliteSink::open(&db_path).unwrap());
        let recovered = recover_journal(&journal, &mut writer).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(recovered.inserted, 1);
        assert!(journal.read_all().await.unwrap().is_empty());
        let rows = stored(&db_path).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reading.temperature, Some(11.0));
    }

    /// TCP bridge: reconnect after a drop, then stop once attempts run out
    #[tokio::test]
    async fn test_e2e_tcp_bridge_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("readings.db");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            // First connection: one frame, then a partial one
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut payload = station_frame("20", "50", "NO", "NO", "300").join("\r\n");
            payload.push_str("\r\n");
            payload.push_str(&format!("{START}\r\nTemperature: 99\r\n"));
            socket.write_all(payload.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            drop(socket);

            // Second connection: one frame, then the bridge goes away for good
            let (mut socket, _) = listener.accept().await.unwrap();
            drop(listener);
            let mut payload = station_frame("21", "51", "YES", "NO", "301").join("\n");
            payload.push('\n');
            socket.write_all(payload.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let source = StreamLineSource::open(StreamTarget::Tcp(address), StreamOptions::default())
            .await
            .unwrap();
        let sink = SqliteSink::open(&db_path).unwrap();
        let report = Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
        .with_reconnect(ReconnectConfig {
            max_attempts: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        })
        .run(std::future::pending())
        .await;
        server.await.unwrap();

        assert!(matches!(
            report.reason,
            ShutdownReason::TransportFault(TransportFault::Open { .. })
        ));
        assert_eq!(report.stats.reconnects, 1);
        assert_eq!(report.stats.partial_frames_discarded, 1);

        let rows = stored(&db_path).await;
        let temps: Vec<_> = rows.iter().map(|r| r.reading.temperature).collect();
        assert_eq!(temps, vec![Some(20.0), Some(21.0)]);
    }

    /// Config-driven `contains` markers over a replayed capture
    #[tokio::test]
    async fn test_e2e_config_driven_markers() {
        let dir = tempfile::tempdir().unwrap();
        let capture_path = dir.path().join("console.log");
        std::fs::write(
            &capture_path,
            "[2026-03-01 12:00:00.000] >> BEGIN <<\n\
             [2026-03-01 12:00:00.001] Temperature: 18.25\n\
             [2026-03-01 12:00:00.002] >> END <<\n",
        )
        .unwrap();

        let toml = format!(
            "[transport]\nkind = \"replay\"\npath = \"{}\"\nreplay_speed = 1000.0\n\n\
             [framing]\nstart_marker = \"BEGIN\"\nend_marker = \"END\"\nmarker_match = \"contains\"\n",
            capture_path.display()
        );
        let config =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let source = ingestion::open_transport(&config.transport).await.unwrap();
        let sink = MemorySink::new();
        let store = sink.store();
        let report = Supervisor::new(
            source,
            FrameAssembler::new(Markers::from(&config.framing)),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
        .run(std::future::pending())
        .await;

        assert!(report.reason.is_clean());
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, Some(18.25));
        assert_eq!(
            rows[0].timestamp,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(2)
        );
    }

    /// Shutdown releases the transport and the store
    #[tokio::test]
    async fn test_e2e_interrupt_closes_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("readings.db");

        let source = ScriptedLineSource::default()
            .lines(station_frame("23", "45", "NO", "NO", "400"))
            .hold_open();
        let tracker = source.tracker();
        let sink = SqliteSink::open(&db_path).unwrap();
        let report = Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
        .run(tokio::time::sleep(Duration::from_millis(100)))
        .await;

        assert!(matches!(report.reason, ShutdownReason::Interrupted));
        assert!(tracker.is_closed());
        assert_eq!(stored(&db_path).await.len(), 1);
    }
}
