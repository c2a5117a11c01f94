use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "tutor-core.log";

/// Keeps the background file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Stdout logging filtered by `config.log_level`, plus a daily rolling file
/// in `config.log_dir` when file logs are on. Falls back to stdout only if
/// the directory cannot be created.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_writer = config
        .file_logs
        .then(|| open_log_dir(Path::new(&config.log_dir)))
        .flatten()
        .map(tracing_appender::non_blocking);

    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

fn open_log_dir(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    Some(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX))
}
