use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult};

pub const FILTER_VAR: &str = "RUST_LOG";
pub const FORMAT_VAR: &str = "ROLLCALL_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(DomainError::validation(format!(
                "{FORMAT_VAR} must be `json` or `pretty`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,rollcall_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl ObservabilityConfig {
    /// `RUST_LOG` (default `info`) and `ROLLCALL_LOG_FORMAT` (`json` default, or `pretty`).
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let defaults = Self::default();
        let filter = lookup(FILTER_VAR)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(defaults.filter);
        let format = match lookup(FORMAT_VAR) {
            Some(raw) => raw.parse()?,
            None => defaults.format,
        };
        Ok(Self { filter, format })
    }
}
