use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jolla_notifications::{
    Backlog, BroadcastManager, IngestStats, Ingestor, NotifyError, RecordParser, RecordSource,
    ScannerConfig,
};

const THREEMA: &str = include_str!("fixtures/threema.txt");
const CLOCK: &str = include_str!("fixtures/clock.txt");
const COMMHISTORYD: &str = include_str!("fixtures/commhistoryd.txt");

fn capture_file(records: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for record in records {
        writeln!(file, "{record}").unwrap();
    }
    file.flush().unwrap();
    file
}

fn fixed_time(_: chrono::DateTime<chrono::Local>) -> String {
    "Thu, 03 Sep 15 10:50 +0200".to_string()
}

#[test]
fn replayed_capture_fills_backlog_newest_first() {
    let capture = capture_file(&[THREEMA, CLOCK, COMMHISTORYD]);
    let reader = RecordSource::File(capture.path().to_path_buf()).open().unwrap();

    let backlog = Arc::new(Backlog::new(2));
    let broadcast = Arc::new(BroadcastManager::new());
    let stats = Ingestor::new(Arc::clone(&backlog), Arc::clone(&broadcast))
        .run(reader)
        .unwrap();

    assert_eq!(
        stats,
        IngestStats {
            records: 3,
            notifications: 3,
            empty: 0,
            malformed: 0,
        }
    );

    let kept: Vec<_> = backlog
        .notifications()
        .iter()
        .map(|n| (n.summary().to_string(), n.body().to_string()))
        .collect();
    assert_eq!(
        kept,
        [
            ("Herp Derp".to_string(), "Test".to_string()),
            ("Uhr".to_string(), "Verbleibende Zeit: 17 Stunden und 18 Minuten".to_string()),
        ]
    );
}

#[test]
fn subscribers_see_every_notification_in_order() {
    let capture = capture_file(&[THREEMA, CLOCK, COMMHISTORYD]);
    let reader = RecordSource::File(capture.path().to_path_buf()).open().unwrap();

    let backlog = Arc::new(Backlog::new(10));
    let broadcast = Arc::new(BroadcastManager::new());
    let subscriptions: Vec<_> = (0..3).map(|_| broadcast.subscribe()).collect();

    let parser = RecordParser::with_formatter(fixed_time as fn(chrono::DateTime<chrono::Local>) -> String);
    let ingestion = Ingestor::with_parser(parser, Arc::clone(&backlog), Arc::clone(&broadcast))
        .spawn(reader)
        .unwrap();

    let readers: Vec<_> = subscriptions
        .into_iter()
        .map(|sub| {
            thread::spawn(move || {
                (0..3)
                    .map(|_| sub.recv_timeout(Duration::from_secs(5)).unwrap())
                    .map(|n| n.body().to_string())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for reader in readers {
        assert_eq!(
            reader.join().unwrap(),
            ["3 neue Nachrichten", "Verbleibende Zeit: 17 Stunden und 18 Minuten", "Test"]
        );
    }

    let stats = ingestion.join().unwrap().unwrap();
    assert_eq!(stats.notifications, 3);
    assert!(backlog
        .notifications()
        .iter()
        .all(|n| n.time() == "Thu, 03 Sep 15 10:50 +0200"));
    assert!(broadcast.is_empty());
}

#[test]
fn dropped_subscriber_does_not_stall_ingestion() {
    let capture = capture_file(&[THREEMA, CLOCK, COMMHISTORYD]);
    let reader = RecordSource::File(capture.path().to_path_buf()).open().unwrap();

    let backlog = Arc::new(Backlog::new(10));
    let broadcast = Arc::new(BroadcastManager::new());
    let listener = broadcast.subscribe();
    let quitter = broadcast.subscribe();

    let ingestion = Ingestor::new(Arc::clone(&backlog), Arc::clone(&broadcast))
        .spawn(reader)
        .unwrap();

    // The quitter never reads; abandoning it must release the producer.
    // Unsubscribing waits for the registry, so it cannot happen on the
    // thread the producer is waiting on.
    thread::spawn(move || drop(quitter));
    for _ in 0..3 {
        listener.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    let stats = ingestion.join().unwrap().unwrap();
    assert_eq!(stats.notifications, 3);
    assert_eq!(backlog.len(), 3);
}

#[test]
fn unterminated_tail_is_still_ingested() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{THREEMA}\n{}", CLOCK.trim_end_matches("int32 -1")).unwrap();
    file.flush().unwrap();

    let backlog = Arc::new(Backlog::new(10));
    let broadcast = Arc::new(BroadcastManager::new());
    let stats = Ingestor::new(Arc::clone(&backlog), broadcast)
        .run(RecordSource::File(file.path().to_path_buf()).open().unwrap())
        .unwrap();

    assert_eq!(stats.records, 2);
    assert_eq!(backlog.notifications()[0].summary(), "Uhr");
}

#[test]
fn oversized_record_stops_ingestion() {
    let padding = "x".repeat(512);
    let capture = capture_file(&[THREEMA, &padding]);

    let backlog = Arc::new(Backlog::new(10));
    let broadcast = Arc::new(BroadcastManager::new());
    let err = Ingestor::new(Arc::clone(&backlog), broadcast)
        .scanner_config(ScannerConfig { max_record_len: 256 })
        .run(RecordSource::File(capture.path().to_path_buf()).open().unwrap())
        .unwrap_err();

    assert!(matches!(err, NotifyError::Scan(_)));
    assert!(err.is_fatal());
}

#[test]
fn missing_capture_file_is_a_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RecordSource::File(dir.path().join("missing.log"))
        .open()
        .map_err(NotifyError::from)
        .unwrap_err();
    assert!(err.is_source());
}
