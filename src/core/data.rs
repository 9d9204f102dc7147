//! Data types for the probe.
//!
//! These types sit between the read transport and the metric translator.
//! They carry no protocol library types, so the translation pipeline can be
//! exercised without a server.

use std::fmt;

use crate::core::address::NodeAddress;

/// Default upper bound on value staleness accepted from the server.
pub const DEFAULT_MAX_AGE_MS: f64 = 2000.0;

/// A value read from a node.
///
/// The remote value is dynamically typed; each variant has a fixed text
/// rendering so the metric output does not depend on ambient formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    /// Integer value (all signed and unsigned widths).
    Integer(i64),

    /// Floating-point number.
    Float(f64),

    /// Boolean value.
    Bool(bool),

    /// String value.
    String(String),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) if v.is_nan() => f.write_str("NaN"),
            Self::Float(v) if v.is_infinite() => {
                f.write_str(if v.is_sign_positive() { "+Inf" } else { "-Inf" })
            }
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for PointValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Widens through the shortest `f32` text, so `0.1f32` renders as `0.1`.
impl From<f32> for PointValue {
    fn from(v: f32) -> Self {
        Self::Float(v.to_string().parse::<f64>().unwrap_or(v as f64))
    }
}

impl From<i64> for PointValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for PointValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u32> for PointValue {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<bool> for PointValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for PointValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for PointValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// Status code attached to a read result.
///
/// Holds the raw 32-bit OPC UA status code. Only the exact Good code
/// counts as OK; "good with info bits" codes are treated as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStatus {
    /// Raw status code.
    pub code: u32,

    /// Symbolic name, when the transport knows it.
    pub name: Option<String>,
}

impl ReadStatus {
    /// The canonical Good status.
    pub const GOOD: Self = Self {
        code: 0,
        name: None,
    };

    /// Create a status from a raw code.
    pub const fn new(code: u32) -> Self {
        Self { code, name: None }
    }

    /// Attach a symbolic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this is the canonical Good status.
    #[inline]
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl Default for ReadStatus {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.code),
            None => write!(f, "0x{:08X}", self.code),
        }
    }
}

/// Outcome of reading one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    /// Status reported for the node.
    pub status: ReadStatus,

    /// The value.
    pub value: PointValue,

    /// Source timestamp as an integer of unknown unit (s, ms, us or ns since epoch).
    pub source_timestamp: i64,
}

impl ReadResult {
    /// Create a Good result.
    pub fn new(value: impl Into<PointValue>, source_timestamp: i64) -> Self {
        Self {
            status: ReadStatus::GOOD,
            value: value.into(),
            source_timestamp,
        }
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: ReadStatus) -> Self {
        self.status = status;
        self
    }
}

/// A batch read request.
///
/// The position of each address is the key used to correlate it with
/// the result list returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// Nodes to read, in order.
    pub addresses: Vec<NodeAddress>,

    /// Maximum age of cached values the server may return, in milliseconds.
    pub max_age_ms: f64,
}

impl ReadRequest {
    /// Create a request with the default max age.
    pub fn new(addresses: Vec<NodeAddress>) -> Self {
        Self {
            addresses,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }

    /// Set the max age hint.
    #[must_use]
    pub fn with_max_age_ms(mut self, max_age_ms: f64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    /// Number of nodes requested.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Check if the request is empty.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
