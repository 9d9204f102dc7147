//! Core traits for read transports.
//!
//! The translation pipeline only needs one thing from the outside world:
//! a batch read that returns one result per requested node, in request
//! order. `ReadTransport` is that seam.
//!
//! ```text
//! resolve_addresses ──► ReadRequest ──► ReadTransport::read ──► translate
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::core::data::{ReadRequest, ReadResult};
use crate::core::error::Result;

/// Connection state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected to the target.
    #[default]
    Disconnected,

    /// Attempting to connect.
    Connecting,

    /// Connected and operational.
    Connected,

    /// Connection error state.
    Error,
}

impl ConnectionState {
    /// Check if currently connected.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Transport diagnostics information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Protocol name.
    pub protocol: String,

    /// Connection state.
    pub connection_state: ConnectionState,

    /// Number of successful batch reads.
    pub read_count: u64,

    /// Number of errors.
    pub error_count: u64,

    /// Last error message.
    pub last_error: Option<String>,

    /// Protocol-specific information.
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Diagnostics {
    /// Create new diagnostics.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            connection_state: ConnectionState::Disconnected,
            read_count: 0,
            error_count: 0,
            last_error: None,
            extra: serde_json::Value::Null,
        }
    }
}

/// A transport able to read a batch of nodes in one round trip.
///
/// Implementations must return exactly one result per requested address,
/// in the order of `ReadRequest::addresses`. Any failure of the round trip
/// is reported as an error for the whole batch.
pub trait ReadTransport: Send {
    /// Get the protocol name.
    fn name(&self) -> &'static str;

    /// Get current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Get diagnostics information.
    fn diagnostics(&self) -> Diagnostics;

    /// Connect to the server.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read all requested nodes.
    fn read(&mut self, request: &ReadRequest) -> impl Future<Output = Result<Vec<ReadResult>>> + Send;

    /// Disconnect from the server.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}
