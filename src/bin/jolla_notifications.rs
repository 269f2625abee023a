//! jolla-notifications server
//!
//! Watches the session bus of a Jolla phone and serves the notifications to
//! a browser over HTTP and WebSocket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jolla_notifications::config::DEFAULT_MAX_NOTIFICATIONS;
use jolla_notifications::source::DBUS_MONITOR_PROGRAM;
use jolla_notifications::transport::{router, AppState};
use jolla_notifications::{
    Backlog, BroadcastManager, IngestStats, Ingestor, NotifyError, NotifyResult, RecordSource,
    ServerConfig,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "jolla-notifications", version)]
#[command(about = "Mirrors Jolla phone notifications to a web browser")]
struct Cli {
    /// Directory containing the web interface
    #[arg(long, env = "JOLLA_HTML_DIR", default_value = "./html")]
    html: PathBuf,

    /// Address to listen on; a bare ":PORT" binds all interfaces
    #[arg(long, env = "JOLLA_LISTEN", default_value = ":8080", value_parser = parse_listen)]
    listen: SocketAddr,

    /// Maximum number of notifications to serve
    #[arg(long, env = "JOLLA_MAX", default_value_t = DEFAULT_MAX_NOTIFICATIONS)]
    max: usize,

    /// Log raw D-Bus records and every HTTP request
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Replay a captured dbus-monitor log instead of watching the bus
    #[arg(long, value_name = "FILE", conflicts_with = "stdin")]
    capture: Option<PathBuf>,

    /// Read dbus-monitor output from stdin
    #[arg(long, default_value_t = false)]
    stdin: bool,

    /// Monitor program to spawn
    #[arg(long, env = "JOLLA_MONITOR_PROGRAM", default_value = DBUS_MONITOR_PROGRAM)]
    monitor_program: PathBuf,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        let source = match (cli.capture, cli.stdin) {
            (Some(path), _) => RecordSource::File(path),
            (None, true) => RecordSource::Stdin,
            (None, false) => RecordSource::dbus_monitor(cli.monitor_program),
        };

        Self {
            listen: cli.listen,
            html_dir: cli.html,
            max_notifications: cli.max,
            verbose: cli.verbose,
            source,
            ..Self::default()
        }
    }
}

fn parse_listen(value: &str) -> Result<SocketAddr, String> {
    let value = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    value
        .parse()
        .map_err(|e| format!("invalid listen address '{value}': {e}"))
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if verbose {
                    "debug".into()
                } else {
                    "info,tower_http=warn".into()
                }
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

type IngestOutcome = thread::Result<NotifyResult<IngestStats>>;

/// Reports the ingestion thread's outcome to the runtime. The watcher is a
/// plain thread so a stream that never ends does not hold up shutdown.
fn watch_ingestion(
    handle: JoinHandle<NotifyResult<IngestStats>>,
) -> NotifyResult<oneshot::Receiver<IngestOutcome>> {
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name("jolla-ingest-watch".to_string())
        .spawn(move || {
            let _ = tx.send(handle.join());
        })
        .map_err(|e| NotifyError::internal(format!("failed to spawn watcher thread: {e}")))?;
    Ok(rx)
}

/// Resolves on Ctrl-C or when ingestion fails. A stream that simply ends
/// leaves the server running with the backlog it has.
async fn shutdown_signal(
    ingestion: oneshot::Receiver<IngestOutcome>,
    failure: oneshot::Sender<NotifyError>,
) {
    let ingestion_failed = async {
        let error = match ingestion.await {
            Ok(Ok(Ok(stats))) => {
                info!(
                    records = stats.records,
                    notifications = stats.notifications,
                    "record source exhausted; still serving the backlog"
                );
                return std::future::pending().await;
            }
            Ok(Ok(Err(e))) => e,
            Ok(Err(_)) => NotifyError::internal("ingestion thread panicked"),
            Err(_) => NotifyError::internal("ingestion watcher went away"),
        };
        error!("ingestion stopped: {error}");
        let _ = failure.send(error);
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("failed to listen for Ctrl-C: {e}");
            }
            info!("shutting down");
        }
        () = ingestion_failed => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from(Cli::parse());
    init_tracing(config.verbose);
    config.validate()?;

    info!("jolla-notifications v{}", env!("CARGO_PKG_VERSION"));

    let backlog = Arc::new(Backlog::new(config.max_notifications));
    let broadcast = Arc::new(BroadcastManager::new());

    info!(source = %config.source, "opening record source");
    let reader = config.source.open()?;
    let ingestion = Ingestor::new(Arc::clone(&backlog), Arc::clone(&broadcast))
        .scanner_config(config.scanner.clone())
        .spawn(reader)?;
    let ingestion = watch_ingestion(ingestion)?;

    let app = router(AppState::new(backlog, broadcast), &config.html_dir);
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| NotifyError::server(format!("failed to bind {}: {e}", config.listen)))?;
    info!(
        html = %config.html_dir.display(),
        "listening on http://{}",
        listener.local_addr()?
    );

    let (failure_tx, mut failure_rx) = oneshot::channel();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ingestion, failure_tx))
        .await?;

    if let Ok(error) = failure_rx.try_recv() {
        return Err(error.into());
    }

    info!("shut down");
    Ok(())
}
