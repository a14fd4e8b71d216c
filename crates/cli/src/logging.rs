//! Logging setup for the CLI

use std::path::Path;

use hashpipe::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Level filter for a config string; unknown values fall back to info
fn parse_level_filter(level: &str) -> LevelFilter {
  level.trim().to_ascii_lowercase().parse().unwrap_or(LevelFilter::INFO)
}

/// Initialize logging from config. `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr, or to `logging.file` when set (no ANSI). Returns the
/// guard that must be kept alive for the duration of the program.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
  let level = parse_level_filter(&config.level);
  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let Some(path) = &config.file else {
    init_stderr(env_filter);
    return None;
  };

  let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  let Some(file_name) = path.file_name() else {
    init_stderr(env_filter);
    return None;
  };
  if std::fs::create_dir_all(dir).is_err() {
    // Fall back to console-only logging
    init_stderr(env_filter);
    return None;
  }

  let file_appender = tracing_appender::rolling::never(dir, file_name);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}

fn init_stderr(env_filter: EnvFilter) {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .with_target(true)
    .init();
}
