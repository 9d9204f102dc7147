//! Logging setup.
//!
//! Diagnostics go through `tracing` to stderr. Stdout is reserved for the
//! metric block, which is what the monitoring pipeline consumes.
//!
//! `RUST_LOG` always wins over the verbosity derived from the command line.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::core::error::{ProbeError, Result};

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    /// Warnings and errors only.
    #[default]
    Minimal,
    /// Every resolved node and every emitted metric line.
    Verbose,
}

impl LogVerbosity {
    /// Filter directive applied when `RUST_LOG` is not set.
    pub const fn default_directive(self) -> &'static str {
        match self {
            Self::Minimal => "warn",
            Self::Verbose => "warn,opcua_metrics=debug",
        }
    }
}

/// Output format of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, compact.
    #[default]
    Compact,
    /// One JSON object per record.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Verbosity level.
    pub verbosity: LogVerbosity,
    /// Record format.
    pub format: LogFormat,
}

impl LogConfig {
    /// Create a configuration.
    pub fn new(verbosity: LogVerbosity, format: LogFormat) -> Self {
        Self { verbosity, format }
    }

    /// Build the env filter, preferring `RUST_LOG` when set.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.verbosity.default_directive()))
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().with_target(true).try_init(),
        LogFormat::Compact => builder
            .compact()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .try_init(),
    };

    installed.map_err(|e| ProbeError::Config(format!("failed to initialize logging: {}", e)))
}
