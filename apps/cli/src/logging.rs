//! Subscriber setup. Logs go to stderr so stdout carries only results.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

/// Configured level, raised to at least `debug` when `verbose` is set
pub fn level(config: &LogConfig, verbose: bool) -> LevelFilter {
    let configured = config.level.parse().unwrap_or(LevelFilter::INFO);
    if verbose {
        configured.max(LevelFilter::DEBUG)
    } else {
        configured
    }
}

/// Filter from `RUST_LOG` if set, otherwise from [`level`]
pub fn filter(config: &LogConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level(config, verbose).to_string()))
}

/// Install the global subscriber
pub fn init(config: &LogConfig, verbose: bool) {
    let filter = filter(config, verbose);

    match config.format {
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact();
            Registry::default().with(filter).with(layer).init();
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false);
            Registry::default().with(filter).with(layer).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str) -> LogConfig {
        LogConfig {
            level: level.into(),
            ..LogConfig::default()
        }
    }

    #[test]
    fn verbose_raises_quiet_levels_to_debug() {
        assert_eq!(level(&config("info"), true), LevelFilter::DEBUG);
        assert_eq!(level(&config("warn"), true), LevelFilter::DEBUG);
        assert_eq!(level(&config("warn"), false), LevelFilter::WARN);
    }

    #[test]
    fn verbose_keeps_trace() {
        assert_eq!(level(&config("trace"), true), LevelFilter::TRACE);
        assert_eq!(level(&config("TRACE"), false), LevelFilter::TRACE);
    }
}
