use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `JIRABAR_LOG=debug`
pub const LOG_ENV: &str = "JIRABAR_LOG";

/// Install the global subscriber.
///
/// Diagnostics go to stderr since stdout carries the menu. When `log_file`
/// is set, the same events are appended there too; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  let (file_layer, guard) = match log_file.and_then(split_path) {
    Some((dir, name)) => {
      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer().with_ansi(false).with_writer(writer);
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(file_layer)
    .try_init();

  guard
}

fn split_path(path: &Path) -> Option<(&Path, &std::ffi::OsStr)> {
  let name = path.file_name()?;
  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  Some((dir, name))
}
