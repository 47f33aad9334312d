//! Telemetry initialization.
//!
//! Events go to stderr so merge output on stdout stays clean. The filter
//! comes from `RUST_LOG` (default `warn`); the format from
//! `TRIMERGE_LOG_FORMAT`:
//! - unset or `"compact"` → compact human-readable lines
//! - `"json"` → JSON spans/events
//! - `"off"` → no subscriber installed

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "TRIMERGE_LOG_FORMAT";

/// Output format of the stderr subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
    Off,
}

impl LogFormat {
    /// Interpret a `TRIMERGE_LOG_FORMAT` value. Unknown values fall back to
    /// [`Self::Compact`].
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            Some(v) if v.eq_ignore_ascii_case("off") => Self::Off,
            _ => Self::Compact,
        }
    }
}

/// Install the global subscriber according to `TRIMERGE_LOG_FORMAT`.
///
/// A second call leaves the first subscriber in place and prints a warning.
pub fn init() {
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let installed = match format {
        LogFormat::Off => Ok(()),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("warning: failed to install tracing subscriber: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_from_env_value() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" off ")), LogFormat::Off);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Compact);
    }
}
