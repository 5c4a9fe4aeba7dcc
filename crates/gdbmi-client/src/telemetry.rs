//! Structured telemetry initialisation.
//!
//! The library only emits `tracing` events. Embedding programs that have no
//! subscriber of their own can install one here.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::defaults::{default_log_filter_string, default_log_format};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// How events are rendered on stderr.
///
/// Parsed case-insensitively from `json` or `compact`.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event.
    #[default]
    Json,
    /// One terse human-readable line per event.
    Compact,
}

/// Error returned when a [`LogFormat`] name is not recognised.
pub type LogFormatParseError = strum::ParseError;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, such as `info` or `gdbmi_client::reader=trace`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Proof that a subscriber is installed, reporting the format it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the subscriber that is actually installed.
    ///
    /// After the first successful [`initialise`] this is the format that
    /// call asked for, whatever later calls pass.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The `log_filter` directive does not parse.
    #[error("log filter `{filter}` is invalid: {message}")]
    Filter {
        /// The rejected directive.
        filter: String,
        /// Why it was rejected.
        message: String,
    },
    /// A subscriber not installed by this crate is already the global
    /// default.
    #[error("another tracing subscriber is already installed: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on the first successful call.
///
/// Later calls leave the global state alone and return a handle describing
/// the subscriber from the first call. A failed first call installs
/// nothing, so it may be retried with a corrected configuration.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when a different subscriber was already
/// installed by someone else.
pub fn initialise(config: &TelemetryConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config).map(|()| config.log_format))
        .map(|&format| TelemetryHandle { format })
}

fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter {
        filter: directive.to_owned(),
        message: error.to_string(),
    })
}

fn build_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        // The reader thread is named, which makes its events easy to spot.
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}

fn install_subscriber(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = parse_filter(&config.log_filter)?;
    tracing::subscriber::set_global_default(build_subscriber(filter, config.log_format))
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        assert_eq!(LogFormat::from_str(text).expect("parse"), expected);
        assert!(LogFormat::from_str("pretty").is_err());
    }

    #[rstest]
    fn default_config_logs_info_as_json() {
        let config = TelemetryConfig::default();

        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[rstest]
    fn deserialises_partial_config() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"log_format": "compact"}"#).expect("deserialise");

        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[rstest]
    fn invalid_filter_names_the_directive() {
        let error = parse_filter("gdbmi_client=notalevel").expect_err("invalid filter");

        assert!(matches!(
            error,
            TelemetryError::Filter { ref filter, .. } if filter == "gdbmi_client=notalevel"
        ));
    }

    #[rstest]
    fn initialise_installs_once_and_reports_the_first_format() {
        let first = TelemetryConfig {
            log_filter: String::from("gdbmi_client=warn"),
            log_format: LogFormat::Compact,
        };
        let second = TelemetryConfig {
            log_filter: String::from("gdbmi_client=notalevel"),
            log_format: LogFormat::Json,
        };

        let installed = initialise(&first).expect("first initialise");
        let repeated = initialise(&second).expect("second initialise");

        assert_eq!(installed.format(), LogFormat::Compact);
        assert_eq!(repeated, installed);
    }
}
