//! Core abstractions for the probe.
//!
//! This module provides the data model, address resolution, timestamp
//! normalization and the transport seam used by the check runner.

pub mod address;
pub mod data;
pub mod error;
pub mod logging;
pub mod timestamp;
pub mod traits;

pub use address::{resolve_addresses, Identifier, NodeAddress};
pub use data::*;
pub use error::{ProbeError, Result};
pub use timestamp::{normalize_timestamp, TimestampUnit};
pub use traits::*;
