//! OPC UA read transport.
//!
//! This module provides `OpcUaTransport`, which wraps an `async-opcua`
//! client session and implements `ReadTransport` with a single batch
//! `Read` service call.
//!
//! Sessions are opened with security policy None and an anonymous
//! identity.
//!
//! # Example
//!
//! ```rust,ignore
//! use opcua_metrics::prelude::*;
//! use opcua_metrics::protocols::opcua::{OpcUaChannelConfig, OpcUaTransport};
//!
//! let config = OpcUaChannelConfig::new("opc.tcp://192.168.1.100:4840");
//! let mut transport = OpcUaTransport::new(config);
//! transport.connect().await?;
//!
//! let request = ReadRequest::new(resolve_addresses(&nodes, None)?);
//! let results = transport.read(&request).await?;
//! transport.disconnect().await?;
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use opcua::client::{ClientBuilder, IdentityToken, Session};
use opcua::crypto::SecurityPolicy;
use opcua::types::{
    DataValue, MessageSecurityMode, NodeId, ReadValueId, StatusCode, TimestampsToReturn,
    UserTokenPolicy, Variant,
};

use crate::core::address::NodeAddress;
use crate::core::data::{PointValue, ReadRequest, ReadResult, ReadStatus};
use crate::core::error::{ProbeError, Result};
use crate::core::traits::{ConnectionState, Diagnostics, ReadTransport};

/// Upper bound for closing a session that never became usable.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// OPC UA channel configuration.
#[derive(Debug, Clone)]
pub struct OpcUaChannelConfig {
    /// Server endpoint URL (e.g., "opc.tcp://192.168.1.100:4840").
    pub endpoint_url: String,

    /// Application name.
    pub application_name: String,

    /// Application URI.
    pub application_uri: String,

    /// Upper bound for establishing the session.
    pub connect_timeout: Duration,

    /// Whether to automatically trust server certificates.
    pub trust_server_certs: bool,

    /// Session retry limit.
    pub session_retry_limit: u32,

    /// PKI directory path (for certificate storage).
    pub pki_dir: Option<String>,
}

impl OpcUaChannelConfig {
    /// Create a new configuration with the given endpoint URL.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            application_name: "opcua-metrics".to_string(),
            application_uri: "urn:opcua-metrics:client".to_string(),
            connect_timeout: Duration::from_secs(10),
            trust_server_certs: true,
            session_retry_limit: 0,
            pki_dir: None,
        }
    }

    /// Set application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set whether to trust server certificates.
    pub fn with_trust_server_certs(mut self, trust: bool) -> Self {
        self.trust_server_certs = trust;
        self
    }

    /// Set session retry limit.
    pub fn with_session_retry_limit(mut self, limit: u32) -> Self {
        self.session_retry_limit = limit;
        self
    }

    /// Set PKI directory.
    pub fn with_pki_dir(mut self, dir: impl Into<String>) -> Self {
        self.pki_dir = Some(dir.into());
        self
    }
}

/// Read statistics kept for diagnostics.
#[derive(Debug, Default)]
struct TransportStats {
    read_count: u64,
    error_count: u64,
    last_error: Option<String>,
    last_read_nodes: usize,
    last_read_duration_ms: Option<u64>,
}

/// OPC UA read transport.
pub struct OpcUaTransport {
    config: OpcUaChannelConfig,
    session: Option<Arc<Session>>,
    state: ConnectionState,
    stats: TransportStats,
}

impl OpcUaTransport {
    /// Create a new, unconnected transport.
    pub fn new(config: OpcUaChannelConfig) -> Self {
        Self {
            config,
            session: None,
            state: ConnectionState::Disconnected,
            stats: TransportStats::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &OpcUaChannelConfig {
        &self.config
    }

    /// Record an error and hand it back for propagation.
    fn record_error(&mut self, error: ProbeError) -> ProbeError {
        self.stats.error_count += 1;
        self.stats.last_error = Some(error.to_string());
        error
    }

    /// Create the session and start its event loop. The session is not yet
    /// activated when this returns.
    async fn open_session(&self) -> Result<Arc<Session>> {
        let mut builder = ClientBuilder::new()
            .application_name(&self.config.application_name)
            .application_uri(&self.config.application_uri)
            .session_retry_limit(self.config.session_retry_limit as i32)
            .create_sample_keypair(true);

        if self.config.trust_server_certs {
            builder = builder.trust_server_certs(true);
        }

        if let Some(pki_dir) = &self.config.pki_dir {
            builder = builder.pki_dir(pki_dir);
        }

        let mut client = builder
            .client()
            .map_err(|e| ProbeError::Config(e.join(", ")))?;

        let (session, event_loop) = client
            .connect_to_matching_endpoint(
                (
                    self.config.endpoint_url.as_str(),
                    SecurityPolicy::None.to_uri(),
                    MessageSecurityMode::None,
                    UserTokenPolicy::anonymous(),
                ),
                IdentityToken::Anonymous,
            )
            .await
            .map_err(|e| ProbeError::transport(format!("UA connection: {}", e)))?;

        // Runs until the session is closed
        let _handle = event_loop.spawn();

        Ok(session)
    }

    /// Open a session and wait for it to activate, all within the connect
    /// timeout. A session that fails to activate is closed before returning.
    async fn establish(&self) -> Result<Arc<Session>> {
        let timeout = self.config.connect_timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        let session = tokio::time::timeout_at(deadline, self.open_session())
            .await
            .unwrap_or_else(|_| Err(self.timed_out(timeout)))?;

        let activated = tokio::time::timeout_at(deadline, session.wait_for_connection())
            .await
            .ok();

        if let Err(failure) = check_activation(activated) {
            close_session(&session).await;
            return Err(match failure {
                ActivationFailure::TimedOut => self.timed_out(timeout),
                ActivationFailure::Closed => {
                    ProbeError::transport("UA connection: session closed before activation")
                }
            });
        }

        Ok(session)
    }

    fn timed_out(&self, timeout: Duration) -> ProbeError {
        ProbeError::transport(format!(
            "UA connection to {} timed out after {}ms",
            self.config.endpoint_url,
            timeout.as_millis()
        ))
    }
}

impl ReadTransport for OpcUaTransport {
    fn name(&self) -> &'static str {
        "OPC UA"
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            protocol: self.name().to_string(),
            connection_state: self.state,
            read_count: self.stats.read_count,
            error_count: self.stats.error_count,
            last_error: self.stats.last_error.clone(),
            extra: serde_json::json!({
                "endpoint_url": self.config.endpoint_url,
                "application_name": self.config.application_name,
                "last_read_nodes": self.stats.last_read_nodes,
                "last_read_duration_ms": self.stats.last_read_duration_ms,
            }),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;

        match self.establish().await {
            Ok(session) => {
                self.session = Some(session);
                self.state = ConnectionState::Connected;
                tracing::debug!(endpoint = %self.config.endpoint_url, "Session connected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(self.record_error(e))
            }
        }
    }

    async fn read(&mut self, request: &ReadRequest) -> Result<Vec<ReadResult>> {
        let session = match self.session.clone() {
            Some(session) => session,
            None => return Err(self.record_error(ProbeError::transport("not connected"))),
        };

        let nodes_to_read = request
            .addresses
            .iter()
            .map(|addr| to_node_id(addr).map(ReadValueId::from))
            .collect::<Result<Vec<_>>>()?;

        let started = Instant::now();
        let values = match session
            .read(&nodes_to_read, TimestampsToReturn::Both, request.max_age_ms)
            .await
        {
            Ok(values) => values,
            Err(status) => {
                return Err(
                    self.record_error(ProbeError::transport(format!(
                        "UA read request failed: {}",
                        status
                    ))),
                );
            }
        };

        self.stats.read_count += 1;
        self.stats.last_read_nodes = values.len();
        self.stats.last_read_duration_ms = Some(started.elapsed().as_millis() as u64);

        Ok(values.iter().map(convert_data_value).collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            if let Err(status) = session.disconnect().await {
                tracing::warn!(status = %status, "Session disconnect failed");
            }
        }

        self.state = ConnectionState::Disconnected;
        Ok(())
    }
}

// ==================== Helper Functions ====================

/// Why a freshly opened session did not become usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationFailure {
    TimedOut,
    Closed,
}

/// Interpret the wait for session activation; `None` means the deadline passed.
fn check_activation(activated: Option<bool>) -> std::result::Result<(), ActivationFailure> {
    match activated {
        Some(true) => Ok(()),
        Some(false) => Err(ActivationFailure::Closed),
        None => Err(ActivationFailure::TimedOut),
    }
}

/// Best-effort close of a session that will not be used.
async fn close_session(session: &Session) {
    match tokio::time::timeout(CLOSE_TIMEOUT, session.disconnect()).await {
        Ok(Ok(())) => {}
        Ok(Err(status)) => tracing::debug!(status = %status, "Closing unused session failed"),
        Err(_) => tracing::debug!("Closing unused session timed out"),
    }
}

/// Convert a resolved address into an OPC UA NodeId.
fn to_node_id(address: &NodeAddress) -> Result<NodeId> {
    let text = address.to_string();
    NodeId::from_str(&text).map_err(|status| ProbeError::invalid_address(text, status.to_string()))
}

/// Convert a DataValue into a read result.
///
/// The source timestamp is handed on as Unix nanoseconds. Without a source
/// timestamp the server timestamp is used, and without either the current
/// time.
fn convert_data_value(dv: &DataValue) -> ReadResult {
    let status = dv
        .status
        .map(convert_status_code)
        .unwrap_or(ReadStatus::GOOD);

    let value = dv
        .value
        .as_ref()
        .map(convert_variant_to_value)
        .unwrap_or(PointValue::Float(f64::NAN));

    let source_timestamp = dv
        .source_timestamp
        .as_ref()
        .or(dv.server_timestamp.as_ref())
        .and_then(|dt| dt.as_chrono().timestamp_nanos_opt())
        .unwrap_or_else(|| Utc::now().timestamp_nanos_opt().unwrap_or_default());

    ReadResult {
        status,
        value,
        source_timestamp,
    }
}

/// Convert OPC UA Variant to a point value.
fn convert_variant_to_value(variant: &Variant) -> PointValue {
    match variant {
        Variant::Boolean(v) => PointValue::Bool(*v),
        Variant::SByte(v) => PointValue::Integer(*v as i64),
        Variant::Byte(v) => PointValue::Integer(*v as i64),
        Variant::Int16(v) => PointValue::Integer(*v as i64),
        Variant::UInt16(v) => PointValue::Integer(*v as i64),
        Variant::Int32(v) => PointValue::Integer(*v as i64),
        Variant::UInt32(v) => PointValue::Integer(*v as i64),
        Variant::Int64(v) => PointValue::Integer(*v),
        Variant::UInt64(v) => i64::try_from(*v)
            .map(PointValue::Integer)
            .unwrap_or(PointValue::Float(*v as f64)),
        Variant::Float(v) => PointValue::from(*v),
        Variant::Double(v) => PointValue::Float(*v),
        Variant::String(v) => PointValue::String(v.as_ref().to_string()),
        Variant::LocalizedText(v) => PointValue::String(v.text.as_ref().to_string()),
        Variant::Empty => PointValue::Float(f64::NAN),
        other => PointValue::String(format!("{:?}", other)),
    }
}

/// Convert OPC UA StatusCode to a read status.
fn convert_status_code(status: StatusCode) -> ReadStatus {
    ReadStatus::new(status.bits()).with_name(status.to_string())
}
