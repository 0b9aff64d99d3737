//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output, human-readable or one JSON object per line
//! - Optional file output with daily rotation via `tracing-appender`
//! - `RUST_LOG` overrides the configured level

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Initialize the global tracing subscriber. Call once at program start.
///
/// - `log_level`: default filter if `RUST_LOG` is not set (e.g. `"info"`,
///   `"scout_events=debug,info"`)
/// - `log_dir`: optional directory for daily-rotating plain-text log files
/// - `file_prefix`: log file name prefix (e.g. `"scout"`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, file_prefix: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, file_prefix))
            .with_ansi(false)
            .with_target(true)
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true).with_ansi(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
