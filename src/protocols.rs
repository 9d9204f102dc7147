//! Protocol implementations.
//!
//! This module contains adapters that implement `ReadTransport` on top of
//! protocol client crates.

#[cfg(feature = "opcua")]
#[cfg_attr(docsrs, doc(cfg(feature = "opcua")))]
pub mod opcua;
