use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs to stderr and to a daily rolling file in `log_dir`.
///
/// `RUST_LOG` overrides `default_level`. Keep the returned guard alive for as long as
/// the file should be written.
pub fn init_logging(default_level: &str, log_dir: &Path) -> WorkerGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = tracing_appender::rolling::daily(log_dir, "hydrate-engine.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}
