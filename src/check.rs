//! Check plugin layer.
//!
//! Argument handling and the run wrapper that turns a read into a check
//! state and printable output.

pub mod config;
pub mod runner;

pub use config::{MetricsFormat, ProbeArgs};
pub use runner::{execute_check, run_check, CheckOutcome, CheckState};
