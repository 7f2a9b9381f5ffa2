use crate::config::{project_dirs, ENV_LOG};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Sends tracing output to a daily rolling file under the data directory.
///
/// The terminal belongs to the UI, so nothing is ever written to stdout.
/// The returned guard must be held until exit or buffered lines are lost.
/// Returns `None` when no log directory can be created; the run continues
/// without logs.
pub fn init_logging(config_level: &str) -> Option<WorkerGuard> {
    let logs_dir = logs_directory()?;
    if std::fs::create_dir_all(&logs_dir).is_err() {
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "paceboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = build_env_filter(std::env::var(ENV_LOG).ok().as_deref(), config_level);
    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );

    // Already set (tests, embedding): keep the guard alive regardless.
    let _ = tracing::subscriber::set_global_default(subscriber);

    Some(guard)
}

pub fn logs_directory() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// `PACEBOARD_LOG`, then the configured level, then `info`. Directives that
/// fail to parse are skipped.
fn build_env_filter(env_level: Option<&str>, config_level: &str) -> EnvFilter {
    env_level
        .into_iter()
        .chain(std::iter::once(config_level))
        .find_map(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_level_wins_over_config() {
        let filter = build_env_filter(Some("debug"), "warn");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn config_level_used_without_env() {
        let filter = build_env_filter(None, "warn");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn unparseable_levels_fall_through() {
        let filter = build_env_filter(Some("paceboard=loud"), "paceboard=verbose");
        assert_eq!(filter.to_string(), "info");
    }
}
