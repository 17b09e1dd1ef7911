use chrono::NaiveDateTime;

use crate::KbarsError;

/// The time range of a bar request: exactly two of `{start, end, length}`.
///
/// The three valid combinations are encoded as variants, so a well-typed
/// request cannot violate the two-of-three rule. Callers translating
/// optional parameters go through [`BarWindow::new`], which rejects every
/// other combination with [`KbarsError::InvalidRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarWindow {
    /// All bars with `start <= datetime <= end`.
    Range {
        /// Inclusive lower bound.
        start: NaiveDateTime,
        /// Inclusive upper bound.
        end: NaiveDateTime,
    },
    /// The first `length` bars with `datetime >= start`.
    Since {
        /// Inclusive lower bound.
        start: NaiveDateTime,
        /// Number of bars requested.
        length: usize,
    },
    /// The last `length` bars with `datetime <= end`.
    Until {
        /// Inclusive upper bound.
        end: NaiveDateTime,
        /// Number of bars requested.
        length: usize,
    },
}

impl BarWindow {
    /// Build a window from optional parameters, enforcing the two-of-three
    /// rule.
    ///
    /// # Errors
    /// Returns [`KbarsError::InvalidRange`] unless exactly two of the three
    /// parameters are set, or when `start > end`.
    pub fn new(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        length: Option<usize>,
    ) -> Result<Self, KbarsError> {
        match (start, end, length) {
            (Some(start), Some(end), None) => Self::range(start, end),
            (Some(start), None, Some(length)) => Ok(Self::Since { start, length }),
            (None, Some(end), Some(length)) => Ok(Self::Until { end, length }),
            _ => Err(KbarsError::invalid_range(
                "exactly two of [start, end, length] must be given",
            )),
        }
    }

    /// Build a `Range` window, rejecting `start > end`.
    ///
    /// # Errors
    /// Returns [`KbarsError::InvalidRange`] when `start > end`.
    pub fn range(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, KbarsError> {
        if start > end {
            return Err(KbarsError::invalid_range(format!(
                "start {start} is later than end {end}"
            )));
        }
        Ok(Self::Range { start, end })
    }

    /// The timestamp the request is anchored to: the end bound when one is
    /// present, otherwise the start bound.
    #[must_use]
    pub const fn anchor(&self) -> NaiveDateTime {
        match self {
            Self::Range { end, .. } | Self::Until { end, .. } => *end,
            Self::Since { start, .. } => *start,
        }
    }

    /// The start bound, if this window has one.
    #[must_use]
    pub const fn start(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Range { start, .. } | Self::Since { start, .. } => Some(*start),
            Self::Until { .. } => None,
        }
    }

    /// The end bound, if this window has one.
    #[must_use]
    pub const fn end(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Range { end, .. } | Self::Until { end, .. } => Some(*end),
            Self::Since { .. } => None,
        }
    }

    /// The requested bar count, if this window has one.
    #[must_use]
    pub const fn length(&self) -> Option<usize> {
        match self {
            Self::Since { length, .. } | Self::Until { length, .. } => Some(*length),
            Self::Range { .. } => None,
        }
    }
}
