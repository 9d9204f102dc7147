//! Metric line encoding.
//!
//! Turns a batch of read results into exposition-format text, one line per
//! node:
//!
//! ```text
//! <point>{ns=<namespace> ,<tag> ,<tag>} <value> <timestamp_ms>
//! ```
//!
//! A single non-Good status anywhere in the batch fails the whole batch;
//! no lines are produced in that case.

use std::fmt;

use crate::core::address::NodeAddress;
use crate::core::data::{PointValue, ReadResult};
use crate::core::error::{ProbeError, Result};
use crate::core::timestamp::normalize_timestamp;

/// Separator placed before each extra tag.
const TAG_SEPARATOR: &str = " ,";

/// One encoded metric line.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    /// Metric name (node identifier).
    pub name: String,
    /// Rendered label set, without braces.
    pub labels: String,
    /// The value.
    pub value: PointValue,
    /// Timestamp in milliseconds since epoch.
    pub timestamp_ms: i64,
}

impl MetricLine {
    /// Build the line for one node and its read result.
    ///
    /// Fails if the result status is not Good.
    pub fn from_result(
        address: &NodeAddress,
        result: &ReadResult,
        extra_tags: &[String],
    ) -> Result<Self> {
        if !result.status.is_ok() {
            return Err(ProbeError::BadReadStatus {
                address: address.to_string(),
                status: result.status.clone(),
            });
        }

        Ok(Self {
            name: address.point_name(),
            labels: build_labels(address, extra_tags),
            value: result.value.clone(),
            timestamp_ms: normalize_timestamp(result.source_timestamp),
        })
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{{}}} {} {}",
            self.name, self.labels, self.value, self.timestamp_ms
        )
    }
}

/// `ns=<namespace>` followed by the configured tags, trimmed, in order.
fn build_labels(address: &NodeAddress, extra_tags: &[String]) -> String {
    let mut labels = format!("ns={}", address.namespace);
    for tag in extra_tags {
        labels.push_str(TAG_SEPARATOR);
        labels.push_str(tag.trim());
    }
    labels
}

/// Encode a batch read into metric lines.
///
/// `results[i]` must be the result for `addresses[i]`. Each line is
/// newline-terminated; the lines keep the order of `addresses`.
pub fn translate(
    addresses: &[NodeAddress],
    results: &[ReadResult],
    extra_tags: &[String],
) -> Result<String> {
    encode_lines(addresses, results, extra_tags).map(|lines| render(&lines))
}

/// Concatenate lines into one output block, each newline-terminated.
pub fn render(lines: &[MetricLine]) -> String {
    lines.iter().fold(String::new(), |mut out, line| {
        out.push_str(&line.to_string());
        out.push('\n');
        out
    })
}

/// Like [`translate`], but returns the individual lines.
pub fn encode_lines(
    addresses: &[NodeAddress],
    results: &[ReadResult],
    extra_tags: &[String],
) -> Result<Vec<MetricLine>> {
    if addresses.len() != results.len() {
        return Err(ProbeError::transport(format!(
            "read returned {} results for {} nodes",
            results.len(),
            addresses.len()
        )));
    }

    addresses
        .iter()
        .zip(results)
        .map(|(address, result)| MetricLine::from_result(address, result, extra_tags))
        .collect()
}
