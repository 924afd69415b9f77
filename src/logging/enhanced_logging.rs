// src/logging/enhanced_logging.rs
//
// Structured JSON logging with daily file rotation, used when
// debug.logging names a {level, dir, file} table. Both stdout and the
// rotated file get JSON records so they can be shipped to an external
// collector.

use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, Registry};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing::{info, error};
use std::io;

/// Initializes JSON logging to stdout plus a daily-rotating file.
///
/// `log_file` is the base name handed to the rolling appender; the
/// actual files on disk get a date suffix appended by `tracing-appender`.
pub fn init_enhanced_logging(log_level: &str, log_dir: &str, log_file: &str) {
    let filter = EnvFilter::new(log_level);

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_file);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    // Leaked deliberately: the guard must outlive the subscriber, and this
    // subscriber is installed once for the lifetime of the process.
    Box::leak(Box::new(guard));

    let stdout_layer = fmt::layer()
        .json()
        .with_writer(io::stdout)
        .with_target(true)
        .with_thread_names(true);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_writer)
        .with_target(true)
        .with_thread_names(true);

    let subscriber = Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    info!(
        "enhanced logging initialized: level={}, log_dir={}, log_file={}",
        log_level, log_dir, log_file
    );
}

pub fn log_error<E: std::error::Error>(err: E) {
    error!("error: {}", err);
}
