//! Source timestamp normalization.
//!
//! Servers do not agree on a clock unit, so the raw source timestamp may be
//! seconds, milliseconds, microseconds or nanoseconds since the Unix epoch.
//! The unit is guessed from the decimal magnitude of the value and the
//! timestamp is re-expressed in milliseconds.
//!
//! The cutoffs imply a practical range of roughly 250 years per band; values
//! outside it are misclassified and that is accepted.

/// `log10 < 10`
const SECONDS_LIMIT: i64 = 10_000_000_000;
/// `log10 < 13`
const MILLIS_LIMIT: i64 = 10_000_000_000_000;
/// `log10 < 16`
const MICROS_LIMIT: i64 = 10_000_000_000_000_000;

/// Unit a raw timestamp is assumed to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampUnit {
    /// Seconds since epoch.
    Seconds,
    /// Milliseconds since epoch.
    Milliseconds,
    /// Microseconds since epoch.
    Microseconds,
    /// Nanoseconds since epoch.
    Nanoseconds,
}

impl TimestampUnit {
    /// Classify a raw timestamp by order of magnitude.
    ///
    /// The bands are compared against exact powers of ten, so a value sits in
    /// the band whose strict upper bound it is below. Zero counts as seconds;
    /// negative values have no magnitude and are treated as nanoseconds.
    pub const fn classify(raw: i64) -> Self {
        if raw < 0 {
            Self::Nanoseconds
        } else if raw < SECONDS_LIMIT {
            Self::Seconds
        } else if raw < MILLIS_LIMIT {
            Self::Milliseconds
        } else if raw < MICROS_LIMIT {
            Self::Microseconds
        } else {
            Self::Nanoseconds
        }
    }

    /// Convert a value in this unit to milliseconds.
    pub const fn to_millis(self, raw: i64) -> i64 {
        match self {
            Self::Seconds => raw * 1_000,
            Self::Milliseconds => raw,
            Self::Microseconds => raw / 1_000,
            Self::Nanoseconds => raw / 1_000_000,
        }
    }
}

/// Normalize a timestamp of unknown unit to milliseconds since epoch.
#[inline]
pub const fn normalize_timestamp(raw: i64) -> i64 {
    TimestampUnit::classify(raw).to_millis(raw)
}
