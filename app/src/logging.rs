use crate::EnvPaths;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install console and daily-rolling file logging under `<data>/logs`.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the server.
pub fn init_logging(
    env_paths: &EnvPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    let logs_dir = env_paths.data_path.join("logs");
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("storefront-admin")
        .filename_suffix("log")
        .build(&logs_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Local offset lookup fails in some multi-threaded environments
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_timer(timer).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    tracing::info!("Logging initialized, writing to {:?}", logs_dir);

    Ok(guard)
}

pub fn log_shutdown() {
    tracing::info!("=== Storefront admin shutdown complete ===");
}
