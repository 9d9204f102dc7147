//! Error types for the probe.

use crate::core::data::ReadStatus;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Everything that can abort a check run.
///
/// There is no partial success: any of these ends the run and the
/// caller decides the user-visible severity.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured node identifier could not be parsed.
    #[error("\"{address}\" has invalid node id: {reason}")]
    InvalidAddress {
        /// The identifier as it was handed to the parser.
        address: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The server reported a non-Good status for one of the nodes.
    #[error("result status not OK for {address}: {status}")]
    BadReadStatus {
        /// Node whose read failed.
        address: String,
        /// Status reported by the server.
        status: ReadStatus,
    },

    /// Connection or read round trip failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProbeError {
    /// Create an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether the error stems from configuration rather than from the run itself.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
