//! tracing subscriber setup

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::common::errors::{ArbError, Result};
use crate::config::types::{LogCollectorConfig, LogFormat};

const COLLECTOR_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const COLLECTOR_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lines queued for the collector before new ones are dropped
const COLLECTOR_BUFFERED_LINES: usize = 10_000;

/// Keeps the collector writer thread alive; flushes it on drop
pub struct LogGuard {
    _collector: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `level` when set. With a collector configured,
/// every event is also shipped as one JSON line over TCP from a
/// background thread. Events never wait on the collector: when it falls
/// behind, lines are dropped. If it cannot be reached, logging continues
/// locally.
pub fn init_tracing(
    level: &str,
    format: LogFormat,
    collector: Option<&LogCollectorConfig>,
) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let pretty = (format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let json = (format == LogFormat::Json).then(|| fmt::layer().json().with_current_span(true));

    let (collector_layer, guard, collector_error) = match collector.map(connect_collector) {
        Some(Ok(stream)) => {
            let (writer, guard) = collector_writer(stream);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
                None,
            )
        }
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(collector_layer)
        .try_init()
        .map_err(|e| ArbError::Configuration(format!("failed to install subscriber: {}", e)))?;

    if let Some(e) = collector_error {
        warn!("Log collector unavailable, logging locally only: {}", e);
    }
    Ok(LogGuard { _collector: guard })
}

fn collector_writer(stream: TcpStream) -> (NonBlocking, WorkerGuard) {
    NonBlockingBuilder::default()
        .lossy(true)
        .buffered_lines_limit(COLLECTOR_BUFFERED_LINES)
        .thread_name("log-collector")
        .finish(stream)
}

fn connect_collector(config: &LogCollectorConfig) -> Result<TcpStream> {
    let target = format!("{}:{}", config.host, config.port);
    let addr = target
        .to_socket_addrs()
        .map_err(|e| ArbError::Configuration(format!("{}: {}", target, e)))?
        .next()
        .ok_or_else(|| ArbError::Configuration(format!("{} did not resolve", target)))?;

    let stream = TcpStream::connect_timeout(&addr, COLLECTOR_CONNECT_TIMEOUT)
        .map_err(|e| ArbError::Configuration(format!("{}: {}", target, e)))?;
    stream
        .set_write_timeout(Some(COLLECTOR_WRITE_TIMEOUT))
        .map_err(|e| ArbError::Configuration(format!("{}: {}", target, e)))?;
    Ok(stream)
}
