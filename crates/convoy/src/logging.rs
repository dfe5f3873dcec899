//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output, always on
//! stderr so stdout carries only the run's results.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `level` is the default filter directive; the RUST_LOG environment
/// variable overrides it when set.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Pick the filter level from config, letting `--verbose` raise it to debug.
pub fn level_for(config_level: &str, verbose: bool) -> &str {
    match config_level {
        "trace" | "debug" => config_level,
        _ if verbose => "debug",
        "error" | "warn" | "info" => config_level,
        _ => "info",
    }
}

/// Initialize logging from the `[logging]` config section and CLI overrides.
pub fn init_from_config(config: &convoy_core::Config, verbose: bool, json_logs: bool) {
    let json_format = json_logs || config.logging.format == "json";
    init(level_for(&config.logging.level, verbose), json_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for("info", false), "info");
        assert_eq!(level_for("warn", true), "debug");
        assert_eq!(level_for("trace", true), "trace");
        assert_eq!(level_for("loud", false), "info");
    }
}
