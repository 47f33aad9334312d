use anyhow::{Result, bail};
use serde::Serialize;
use std::str::FromStr;

/// Output format for command reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, one line per item
    #[default]
    Text,
    /// JSON - machine-parseable
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid format '{s}'. Use: text or json"),
        }
    }
}

impl OutputFormat {
    /// `--json` wins over `--format`.
    #[must_use]
    pub fn with_json_flag(format: Option<Self>, json: bool) -> Self {
        if json { Self::Json } else { format.unwrap_or_default() }
    }

    /// Serialize a report as pretty JSON.
    pub fn to_json<T: Serialize>(data: &T) -> Result<String> {
        serde_json::to_string_pretty(data)
            .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))
    }
}
