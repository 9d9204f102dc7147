//! Check configuration.
//!
//! Every option can be given on the command line or through an
//! environment variable; list options are comma separated.

use std::str::FromStr;

use clap::Parser;

use crate::core::data::DEFAULT_MAX_AGE_MS;
use crate::core::error::{ProbeError, Result};
use crate::core::logging::{LogConfig, LogFormat, LogVerbosity};

/// Default OPC UA endpoint.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840";

/// Supported metric output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsFormat {
    /// `name{labels} value timestamp`
    #[default]
    Prometheus,
}

impl FromStr for MetricsFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("prometheus") {
            Ok(Self::Prometheus)
        } else {
            Err(ProbeError::Config(
                "only prometheus metrics output format supported at this time".into(),
            ))
        }
    }
}

/// Metrics for OPC UA nodes
#[derive(Parser, Debug, Clone)]
#[command(name = "opcua-metrics", version, about, long_about = None)]
pub struct ProbeArgs {
    /// OPC UA endpoint
    #[arg(short, long, env = "OPCUA_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Metrics format (currently only prometheus supported)
    #[arg(long, env = "OPCUA_METRICS_FORMAT", default_value = "prometheus")]
    pub metrics_format: String,

    /// Comma separated list of OPC UA nodes to read (ex "ns=1;s=NODE_NAME1, ns=1;s=NODE_NAME2")
    #[arg(short, long, env = "OPCUA_NODES", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Namespace index, used with nodes to form the full node id (ns=<namespace>;s=<node>)
    #[arg(short = 'N', long, env = "OPCUA_NAMESPACE")]
    pub namespace: Option<String>,

    /// Comma separated list of additional metric tags (ex "first=value, second=value")
    #[arg(short, long, env = "OPCUA_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Maximum age of cached values the server may return, in milliseconds
    #[arg(long, env = "OPCUA_MAX_AGE_MS", default_value_t = DEFAULT_MAX_AGE_MS)]
    pub max_age_ms: f64,

    /// Connection timeout in milliseconds
    #[arg(long, env = "OPCUA_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Dry-run, do not communicate with endpoint, implies verbose
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit log records as JSON
    #[arg(long, env = "OPCUA_LOG_JSON")]
    pub log_json: bool,
}

impl ProbeArgs {
    /// Check that the arguments describe a runnable check.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ProbeError::Config(
                "--endpoint or OPCUA_ENDPOINT environment variable is required".into(),
            ));
        }
        if self.node_ids().is_empty() {
            return Err(ProbeError::Config(
                "--nodes or OPCUA_NODES environment variable is required".into(),
            ));
        }
        MetricsFormat::from_str(&self.metrics_format)?;
        if !(self.max_age_ms >= 0.0) {
            return Err(ProbeError::Config(format!(
                "--max-age-ms must be a non-negative number, got {}",
                self.max_age_ms
            )));
        }
        Ok(())
    }

    /// Configured node identifiers, blank entries dropped.
    pub fn node_ids(&self) -> Vec<String> {
        non_blank(&self.nodes)
    }

    /// Configured extra tags, blank entries dropped.
    pub fn extra_tags(&self) -> Vec<String> {
        non_blank(&self.tags)
    }

    /// Whether intermediate nodes and values should be logged.
    #[inline]
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.dry_run
    }

    /// Logging configuration derived from the flags.
    pub fn log_config(&self) -> LogConfig {
        let verbosity = if self.is_verbose() {
            LogVerbosity::Verbose
        } else {
            LogVerbosity::Minimal
        };
        let format = if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
        LogConfig::new(verbosity, format)
    }

    /// OPC UA channel configuration for the transport.
    #[cfg(feature = "opcua")]
    pub fn channel_config(&self) -> crate::protocols::opcua::OpcUaChannelConfig {
        crate::protocols::opcua::OpcUaChannelConfig::new(self.endpoint.trim())
            .with_connect_timeout(std::time::Duration::from_millis(self.connect_timeout_ms))
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ProbeArgs {
        ProbeArgs::try_parse_from(std::iter::once("opcua-metrics").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-n", "ns=1;s=A"]);
        assert_eq!(args.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(args.metrics_format, "prometheus");
        assert_eq!(args.max_age_ms, DEFAULT_MAX_AGE_MS);
        assert!(args.namespace.is_none());
        assert!(!args.is_verbose());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_comma_separated_lists() {
        let args = parse(&[
            "--nodes",
            "ns=1;s=NODE_NAME1, ns=1;s=NODE_NAME2",
            "--tags",
            "first=value, second=value",
        ]);
        assert_eq!(args.nodes, vec!["ns=1;s=NODE_NAME1", " ns=1;s=NODE_NAME2"]);
        assert_eq!(args.tags, vec!["first=value", " second=value"]);
    }

    #[test]
    fn test_blank_entries_dropped() {
        let args = parse(&["-n", "A,, B,", "-t", "env=prod, "]);
        assert_eq!(args.node_ids(), vec!["A", " B"]);
        assert_eq!(args.extra_tags(), vec!["env=prod"]);
    }

    #[test]
    fn test_missing_nodes() {
        let args = parse(&[]);
        match args.validate() {
            Err(ProbeError::Config(msg)) => assert!(msg.contains("--nodes")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_endpoint() {
        let args = parse(&["-e", "", "-n", "ns=1;s=A"]);
        assert!(matches!(args.validate(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let args = parse(&["-n", "ns=1;s=A", "--metrics-format", "influx"]);
        assert!(matches!(args.validate(), Err(ProbeError::Config(_))));

        let args = parse(&["-n", "ns=1;s=A", "--metrics-format", "Prometheus"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_negative_max_age() {
        let args = parse(&["-n", "ns=1;s=A", "--max-age-ms=-1"]);
        assert!(matches!(args.validate(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn test_dry_run_implies_verbose() {
        let args = parse(&["-n", "A", "-N", "2", "--dry-run"]);
        assert!(args.is_verbose());
        assert_eq!(args.log_config().verbosity, LogVerbosity::Verbose);
        assert_eq!(args.namespace.as_deref(), Some("2"));
    }

    #[test]
    fn test_json_logging() {
        let args = parse(&["-n", "A", "--log-json"]);
        assert_eq!(args.log_config().format, LogFormat::Json);
    }

    #[cfg(feature = "opcua")]
    #[test]
    fn test_channel_config() {
        let args = parse(&["-e", "opc.tcp://plc:4840", "-n", "A", "--connect-timeout-ms", "2500"]);
        let config = args.channel_config();
        assert_eq!(config.endpoint_url, "opc.tcp://plc:4840");
        assert_eq!(config.connect_timeout, std::time::Duration::from_millis(2500));
    }
}
