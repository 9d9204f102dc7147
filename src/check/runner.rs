//! Check execution.
//!
//! One run is: resolve the configured nodes, read them in a single batch,
//! translate the results into metric lines. Any failure aborts the run and
//! is mapped to a check state; there is no retry and no partial output.

use std::fmt;

use tracing::{debug, info, warn};

use crate::check::config::ProbeArgs;
use crate::codec::exposition::{encode_lines, render};
use crate::core::address::resolve_addresses;
use crate::core::data::ReadRequest;
use crate::core::error::{ProbeError, Result};
use crate::core::traits::ReadTransport;

/// Name reported in check output.
pub const CHECK_NAME: &str = "opcua-metrics";

/// Outcome severity of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckState {
    /// Metrics collected.
    Ok,
    /// The check is misconfigured.
    Warning,
    /// The check ran and failed.
    Critical,
    /// The check did not run to completion.
    Unknown,
}

impl CheckState {
    /// Process exit code for this state.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Severity for an error that ended the run.
    pub fn from_error(error: &ProbeError) -> Self {
        match error {
            ProbeError::Config(_) => Self::Warning,
            ProbeError::InvalidAddress { .. }
            | ProbeError::BadReadStatus { .. }
            | ProbeError::Transport(_) => Self::Critical,
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Result of one check execution, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Check state.
    pub state: CheckState,
    /// Text for stdout: the metric block, or a one-line failure message.
    pub output: String,
}

impl CheckOutcome {
    /// Successful run with its metric block.
    pub fn ok(output: String) -> Self {
        Self {
            state: CheckState::Ok,
            output,
        }
    }

    /// The check was aborted before producing a result.
    pub fn unknown(reason: impl fmt::Display) -> Self {
        Self {
            state: CheckState::Unknown,
            output: format!("{} {}: {}", CHECK_NAME, CheckState::Unknown, reason),
        }
    }

    /// Failed run.
    pub fn from_error(error: &ProbeError) -> Self {
        let state = CheckState::from_error(error);
        Self {
            state,
            output: format!("{} {}: {}", CHECK_NAME, state, error),
        }
    }

    /// Process exit code.
    #[inline]
    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }
}

/// Validate the arguments, run the check and map the result to an outcome.
pub async fn execute_check<T: ReadTransport>(args: &ProbeArgs, transport: &mut T) -> CheckOutcome {
    if let Err(e) = args.validate() {
        warn!(error = %e, "Invalid check arguments");
        return CheckOutcome::from_error(&e);
    }

    match run_check(args, transport).await {
        Ok(output) => CheckOutcome::ok(output),
        Err(e) => {
            warn!(error = %e, "Check failed");
            CheckOutcome::from_error(&e)
        }
    }
}

/// Resolve, read and translate; returns the metric block.
///
/// In dry-run mode the nodes are resolved and logged but the transport is
/// never contacted, and the block is empty.
pub async fn run_check<T: ReadTransport>(args: &ProbeArgs, transport: &mut T) -> Result<String> {
    let addresses = resolve_addresses(&args.node_ids(), args.namespace.as_deref())?;

    debug!(count = addresses.len(), "Reading nodes");
    for address in &addresses {
        debug!(node = %address, "Node");
    }

    if args.dry_run {
        info!(
            endpoint = %args.endpoint,
            nodes = addresses.len(),
            "Dry run, endpoint not contacted"
        );
        return Ok(String::new());
    }

    let request = ReadRequest::new(addresses).with_max_age_ms(args.max_age_ms);

    transport.connect().await?;
    let read = transport.read(&request).await;
    let disconnected = transport.disconnect().await;

    if let Ok(diag) = serde_json::to_string(&transport.diagnostics()) {
        debug!(diagnostics = %diag, "Transport diagnostics");
    }

    let results = read?;
    disconnected?;

    let lines = encode_lines(&request.addresses, &results, &args.extra_tags())?;
    for line in &lines {
        debug!(metric = %line, "Metric");
    }

    Ok(render(&lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::{ReadResult, ReadStatus};
    use crate::core::traits::{ConnectionState, Diagnostics};
    use clap::Parser;

    #[derive(Default)]
    struct MockTransport {
        results: Vec<ReadResult>,
        connect_error: Option<String>,
        read_error: Option<String>,
        connect_calls: usize,
        disconnect_calls: usize,
        requests: Vec<ReadRequest>,
        state: ConnectionState,
    }

    impl MockTransport {
        fn with_results(results: Vec<ReadResult>) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }
    }

    impl ReadTransport for MockTransport {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn connection_state(&self) -> ConnectionState {
            self.state
        }

        fn diagnostics(&self) -> Diagnostics {
            Diagnostics::new(self.name())
        }

        async fn connect(&mut self) -> Result<()> {
            self.connect_calls += 1;
            match &self.connect_error {
                Some(e) => Err(ProbeError::transport(e.clone())),
                None => {
                    self.state = ConnectionState::Connected;
                    Ok(())
                }
            }
        }

        async fn read(&mut self, request: &ReadRequest) -> Result<Vec<ReadResult>> {
            self.requests.push(request.clone());
            match &self.read_error {
                Some(e) => Err(ProbeError::transport(e.clone())),
                None => Ok(self.results.clone()),
            }
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.disconnect_calls += 1;
            self.state = ConnectionState::Disconnected;
            Ok(())
        }
    }

    fn args(extra: &[&str]) -> ProbeArgs {
        ProbeArgs::try_parse_from(std::iter::once("opcua-metrics").chain(extra.iter().copied()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run() {
        let mut transport = MockTransport::with_results(vec![
            ReadResult::new(42.5, 1_700_000_000),
            ReadResult::new(7, 1_700_000_000_123),
        ]);
        let args = args(&["-n", "ns=1;s=A, ns=1;s=B", "-t", " env=prod "]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Ok);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            outcome.output,
            "A{ns=1 ,env=prod} 42.5 1700000000000\nB{ns=1 ,env=prod} 7 1700000000123\n"
        );
        assert_eq!(transport.connect_calls, 1);
        assert_eq!(transport.disconnect_calls, 1);
        assert_eq!(transport.requests.len(), 1);
        assert_eq!(transport.requests[0].max_age_ms, 2000.0);
    }

    #[tokio::test]
    async fn test_namespace_applied_to_request() {
        let mut transport = MockTransport::with_results(vec![ReadResult::new(1, 0)]);
        let args = args(&["-n", " NODE1 ", "-N", "2", "--max-age-ms", "500"]);

        run_check(&args, &mut transport).await.unwrap();

        let request = &transport.requests[0];
        assert_eq!(request.addresses[0].to_string(), "ns=2;s=NODE1");
        assert_eq!(request.max_age_ms, 500.0);
    }

    #[tokio::test]
    async fn test_invalid_address_skips_transport() {
        let mut transport = MockTransport::default();
        let args = args(&["-n", "ns=1;s=A,ns=x;bad"]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Critical);
        assert!(outcome.output.contains("ns=x;bad"));
        assert_eq!(transport.connect_calls, 0);
        assert!(transport.requests.is_empty());
    }

    #[tokio::test]
    async fn test_bad_status_is_critical_without_metrics() {
        let mut transport = MockTransport::with_results(vec![
            ReadResult::new(1, 1_700_000_000),
            ReadResult::new(2, 1_700_000_000).with_status(ReadStatus::new(0x8034_0000)),
        ]);
        let args = args(&["-n", "ns=1;s=A,ns=1;s=B"]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Critical);
        assert_eq!(outcome.exit_code(), 2);
        assert!(outcome.output.starts_with("opcua-metrics CRITICAL:"));
        assert!(!outcome.output.contains("A{"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_critical() {
        let mut transport = MockTransport {
            connect_error: Some("connection refused".into()),
            ..Default::default()
        };
        let args = args(&["-n", "ns=1;s=A"]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Critical);
        assert!(outcome.output.contains("connection refused"));
        assert!(transport.requests.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_still_disconnects() {
        let mut transport = MockTransport {
            read_error: Some("BadTimeout".into()),
            ..Default::default()
        };
        let args = args(&["-n", "ns=1;s=A"]);

        let err = run_check(&args, &mut transport).await.unwrap_err();

        assert!(matches!(err, ProbeError::Transport(_)));
        assert_eq!(transport.disconnect_calls, 1);
        assert_eq!(transport.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_touch_transport() {
        let mut transport = MockTransport::default();
        let args = args(&["-n", "ns=1;s=A", "--dry-run"]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Ok);
        assert!(outcome.output.is_empty());
        assert_eq!(transport.connect_calls, 0);
    }

    #[tokio::test]
    async fn test_missing_nodes_is_warning() {
        let mut transport = MockTransport::default();
        let args = args(&[]);

        let outcome = execute_check(&args, &mut transport).await;

        assert_eq!(outcome.state, CheckState::Warning);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(transport.connect_calls, 0);
    }

    #[test]
    fn test_check_state_mapping() {
        assert_eq!(
            CheckState::from_error(&ProbeError::Config("x".into())),
            CheckState::Warning
        );
        assert_eq!(
            CheckState::from_error(&ProbeError::invalid_address("x", "y")),
            CheckState::Critical
        );
        assert_eq!(
            CheckState::from_error(&ProbeError::transport("x")),
            CheckState::Critical
        );
        assert_eq!(CheckState::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_aborted_check_is_unknown() {
        let outcome = CheckOutcome::unknown("check task panicked");

        assert_eq!(outcome.state, CheckState::Unknown);
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(
            outcome.output,
            "opcua-metrics UNKNOWN: check task panicked"
        );
    }

    #[tokio::test]
    async fn test_panicked_task_maps_to_unknown() {
        let handle = tokio::spawn(async {
            if true {
                panic!("transport bug");
            }
            CheckOutcome::ok(String::new())
        });

        let outcome = handle
            .await
            .unwrap_or_else(|e| CheckOutcome::unknown(format!("check aborted: {}", e)));
        assert_eq!(outcome.state, CheckState::Unknown);
        assert!(outcome.output.starts_with("opcua-metrics UNKNOWN: check aborted"));
    }
}
