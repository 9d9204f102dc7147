//! Output encoding.

pub mod exposition;

pub use exposition::{encode_lines, render, translate, MetricLine};
