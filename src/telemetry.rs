//! Logging setup for hosts that do not install their own subscriber

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse a log level name, falling back to `info`
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a stderr subscriber filtered to this crate at `level`.
///
/// Returns false when a global subscriber is already set.
pub fn init_tracing(level: &str) -> bool {
    let level = parse_level(level);
    let filter = EnvFilter::new(format!("prismatic={}", level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
