use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: a daily-rolling file under `log_dir`, plus
/// stderr when `to_stderr` is set. `RUST_LOG` overrides the default `info`.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(log_dir: &Path, to_stderr: bool) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "runes.log"));
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        // No log directory; carry on without the file layer.
        Err(_) => (None, None),
    };

    let stderr_layer = to_stderr.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}
