use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);

/// Keeps the non-blocking file writer alive; drop it only at process exit.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

pub fn init_logging(
    log_dir: impl AsRef<Path>,
    prefix: &str,
    level: &str,
) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();
    fs::create_dir_all(&log_dir)?;

    let (default_level, level_valid) = match level.parse::<LevelFilter>() {
        Ok(level) => (level, true),
        Err(_) => (LevelFilter::INFO, false),
    };

    let builder = EnvFilter::builder().with_default_directive(default_level.into());
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    if !level_valid {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    match cleanup_old_logs(&log_dir, prefix, MAX_LOG_AGE) {
        Ok(0) => {}
        Ok(removed) => tracing::info!("Removed {} old log file(s)", removed),
        Err(e) => tracing::warn!("Failed to delete old log files: {}", e),
    }

    Ok(LoggerGuard(guard))
}

/// Delete `<prefix>*.log` files in `log_dir` last modified more than `max_age` ago.
pub fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }

        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&path)?;
            tracing::debug!("Old log file deleted: {}", file_name);
            removed += 1;
        }
    }
    Ok(removed)
}
