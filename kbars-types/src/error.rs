use thiserror::Error;

/// Unified error type for the kbars workspace.
///
/// Covers malformed range requests, missing data, transient source failures,
/// and unsupported frequency combinations. An out-of-range timestamp is not
/// an error: callers clamp to the nearest boundary and log a warning.
#[derive(Debug, Error)]
pub enum KbarsError {
    /// The caller supplied an invalid combination of `start`/`end`/`length`.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The source holds no data for the requested instrument and frequency.
    #[error("no data: {what}")]
    NoData {
        /// Description of the missing data, e.g. "1m bars for 000001.XSHE".
        what: String,
    },

    /// A remote source call failed; may succeed on retry.
    #[error("{source_name} failed: {msg}")]
    Source {
        /// Name of the source that failed.
        source_name: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The requested aggregation unit/combination is not implemented.
    #[error("unsupported frequency: {frequency}")]
    UnsupportedFrequency {
        /// The offending frequency string, e.g. "2h".
        frequency: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl KbarsError {
    /// Helper: build an `InvalidRange` error.
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Helper: build a `NoData` error for a description of the missing data.
    pub fn no_data(what: impl Into<String>) -> Self {
        Self::NoData { what: what.into() }
    }

    /// Helper: build a `Source` error with the source name and message.
    pub fn source(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `UnsupportedFrequency` error.
    pub fn unsupported_frequency(frequency: impl ToString) -> Self {
        Self::UnsupportedFrequency {
            frequency: frequency.to_string(),
        }
    }

    /// Whether a bounded retry may succeed (remote source failures only).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Source { .. })
    }
}
