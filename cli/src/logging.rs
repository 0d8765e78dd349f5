use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use egrun_core::api::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// The returned guard flushes the file writer on drop; keep it alive until exit.
pub fn init(cfg: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match &cfg.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &cfg.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
