// src/logging.rs
//
// Basic logging setup via tracing-subscriber::fmt(), used when
// debug.logging is a bare level string rather than a structured table.

use tracing_subscriber::{fmt, EnvFilter};
use tracing::info;

pub mod enhanced_logging;

pub fn init_basic_logging(log_level: &str) {
    let filter = EnvFilter::new(log_level);
    fmt().with_env_filter(filter).init();

    info!("basic logging initialized at level={}", log_level);
}

/// Picks basic or enhanced logging per `debug.logging` (config_loader's
/// `LoggingConfig`): a bare level string gets the plain subscriber, a
/// `{level, dir, file}` table gets JSON-plus-rotating-file.
pub fn init_from_config(config: &crate::config_loader::LoggingConfig) {
    match config {
        crate::config_loader::LoggingConfig::Level(level) => init_basic_logging(level),
        crate::config_loader::LoggingConfig::Structured { level, dir, file } => {
            enhanced_logging::init_enhanced_logging(level, dir, file)
        }
    }
}
