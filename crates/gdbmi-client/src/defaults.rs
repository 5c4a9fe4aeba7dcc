//! Default values shared by configuration and the session.

use std::path::PathBuf;
use std::time::Duration;

/// Debugger executable used when none is configured.
pub const DEFAULT_COMMAND: &str = "gdb";

/// Arguments that select the MI2 interpreter and suppress start-up noise.
pub const DEFAULT_ARGS: [&str; 3] = ["--nx", "--quiet", "--interpreter=mi2"];

/// Grace period, in milliseconds, between the exit handshake and killing
/// the debugger.
pub const DEFAULT_EXIT_GRACE_PERIOD_MS: u64 = 200;

/// Operation sent to end the debugger session.
pub const EXIT_OPERATION: &str = "gdb-exit";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default debugger executable.
#[must_use]
pub fn default_command() -> PathBuf {
    PathBuf::from(DEFAULT_COMMAND)
}

/// Default debugger arguments.
#[must_use]
pub fn default_args() -> Vec<String> {
    DEFAULT_ARGS.iter().map(|arg| (*arg).to_owned()).collect()
}

/// Default exit grace period in milliseconds.
#[must_use]
pub const fn default_exit_grace_period_ms() -> u64 {
    DEFAULT_EXIT_GRACE_PERIOD_MS
}

/// Default exit grace period.
#[must_use]
pub const fn default_exit_grace_period() -> Duration {
    Duration::from_millis(DEFAULT_EXIT_GRACE_PERIOD_MS)
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log output format.
#[must_use]
pub const fn default_log_format() -> crate::telemetry::LogFormat {
    crate::telemetry::LogFormat::Json
}
