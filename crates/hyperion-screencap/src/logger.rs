use tracing::{
    Level,
    subscriber::{SetGlobalDefaultError, set_global_default},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt};

use crate::utilities::directories::config_dir;

const LOG_FILE_PREFIX: &str = "hyperion-screencap.log";

/// Installs the stdout and daily rolling file loggers.
///
/// The returned guards flush the writers when dropped and must be held for the lifetime of the
/// application.
pub fn setup_logger(debug: bool) -> Result<[WorkerGuard; 2], SetGlobalDefaultError> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = tracing_subscriber::filter::Targets::new().with_default(level);

    // stdout logger
    let (std_writer, std_guard) = tracing_appender::non_blocking(std::io::stdout());
    let std_logger = tracing_subscriber::fmt::layer()
        .with_writer(std_writer)
        .with_ansi(false)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    // file logger
    let file_appender = tracing_appender::rolling::daily(config_dir(), LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_logger = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    // Register loggers
    let collector = tracing_subscriber::registry()
        .with(std_logger)
        .with(file_logger)
        .with(filter);

    set_global_default(collector)?;

    Ok([std_guard, file_guard])
}
