//! Logging setup with optional non-blocking file output.

use std::{io::IsTerminal, path::Path};

use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, fmt::time::ChronoUtc, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LOG_TARGET: &str = "tool_call_extractor";
const LOG_FILE_PREFIX: &str = "tool-call-extractor.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_format: bool,
    /// Directory for daily-rotated log files; stderr only when unset
    pub log_dir: Option<String>,
    pub colorize: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_format: false,
            log_dir: None,
            colorize: std::io::stderr().is_terminal(),
        }
    }
}

/// Guard that keeps the file appender thread alive.
#[allow(dead_code)]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter used when `RUST_LOG` is unset: this crate's events at `level`.
fn default_filter(level: Level) -> String {
    format!("{}={}", LOG_TARGET, level.to_string().to_lowercase())
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

fn file_layer<S>(
    log_dir: &Path,
    json_format: bool,
) -> std::io::Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
        .with_writer(non_blocking);

    let layer = if json_format {
        layer.json().flatten_event(true).boxed()
    } else {
        layer.boxed()
    };
    Ok((layer, guard))
}

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// command output.
///
/// A log directory that cannot be created is reported on stderr and file
/// output is skipped; stderr logging is still installed.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.level)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colorize)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()));

    let stderr_layer = if config.json_format {
        stderr_layer.json().flatten_event(true).boxed()
    } else {
        stderr_layer.boxed()
    };

    let mut layers = vec![stderr_layer];
    let mut file_guard = None;

    if let Some(log_dir) = &config.log_dir {
        match file_layer(Path::new(log_dir), config.json_format) {
            Ok((layer, guard)) => {
                layers.push(layer);
                file_guard = Some(guard);
            }
            Err(e) => eprintln!("Failed to create log directory {}: {}", log_dir, e),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}
