//! # opcua-metrics
//!
//! A monitoring check that reads a set of OPC UA nodes and prints them as
//! metric lines:
//!
//! ```text
//! Temperature{ns=2 ,site=plant1} 21.5 1700000000000
//! ```
//!
//! ## Features
//!
//! - **Single round trip**: all nodes are read in one batch `Read` call
//! - **All or nothing**: one bad node status fails the whole check
//! - **Timestamp normalization**: source timestamps in s, ms, us or ns are
//!   converted to milliseconds
//! - **Feature Gated**: the OPC UA client is behind the `opcua` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use opcua_metrics::prelude::*;
//!
//! let addresses = resolve_addresses(&nodes, Some("2"))?;
//! let results = transport.read(&ReadRequest::new(addresses.clone())).await?;
//! print!("{}", translate(&addresses, &results, &tags)?);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod check;
pub mod codec;
pub mod core;
pub mod protocols;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::check::{execute_check, run_check, CheckOutcome, CheckState, ProbeArgs};
    pub use crate::codec::{encode_lines, translate, MetricLine};
    pub use crate::core::{
        address::*,
        data::*,
        error::{ProbeError, Result},
        timestamp::*,
        traits::*,
    };
}

// Re-export core types at crate root for convenience
pub use crate::codec::translate;
pub use crate::core::address::{resolve_addresses, NodeAddress};
pub use crate::core::data::{PointValue, ReadRequest, ReadResult, ReadStatus};
pub use crate::core::error::{ProbeError, Result};
pub use crate::core::timestamp::normalize_timestamp;
pub use crate::core::traits::{ConnectionState, ReadTransport};
