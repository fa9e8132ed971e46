use anyhow::Context;
use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);

/// Keeps the file writer alive; drop it last.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Normalize a configured level, falling back to `info`
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Daily rolling file in `log_dir` plus console output on stderr.
///
/// `RUST_LOG` overrides `level` for both outputs. Stdout is left to the CLI.
pub fn init_logging(
    log_dir: impl AsRef<Path>,
    prefix: &str,
    level: &str,
) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref();

    let normalized = normalize_level(level);
    let builder = EnvFilter::builder().with_default_directive(
        normalized
            .parse()
            .context("Failed to parse log level directive")?,
    );

    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create file appender")?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if normalized != level.trim().to_lowercase() {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    match cleanup_old_logs(log_dir, prefix, MAX_LOG_AGE) {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Deleted {} old log files", n),
        Err(e) => tracing::warn!("Failed to delete old log file: {}", e),
    }

    Ok(LoggerGuard(guard))
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        deleted += 1;
                    }
                }
            }
        }
    }
    Ok(deleted)
}
