//! Process-wide tracing setup.
//!
//! Logs go to stdout, JSON by default, filtered through `RUST_LOG` when set
//! and [`LogOptions::default_filter`] otherwise.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Default directive: our crates at `info`, sqlx statements at `warn`.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    /// Human readable, for local runs.
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogOptions {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: default_filter(),
        }
    }
}

/// Initialize with default options.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&LogOptions::default());
}

pub fn init_with(options: &LogOptions) {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref(), &options.default_filter);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // try_init: a second call finds the global subscriber set and does nothing.
    let _ = match options.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

/// `RUST_LOG` wins when it parses; otherwise the fallback, otherwise `info`.
fn env_filter(from_env: Option<&str>, fallback: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(fallback).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_override_the_fallback() {
        let filter = env_filter(Some("debug"), DEFAULT_FILTER);
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn unparsable_env_falls_back() {
        let filter = env_filter(Some("stockroom=notalevel"), "warn");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init_with(&LogOptions {
            format: LogFormat::Pretty,
            ..Default::default()
        });
    }
}
