use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KbarsError;

/// Time unit of a bar frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreqUnit {
    /// Minute bars (`m`).
    Minute,
    /// Hour bars (`h`).
    Hour,
    /// Day bars (`d`).
    Day,
}

impl FreqUnit {
    const fn suffix(self) -> char {
        match self {
            Self::Minute => 'm',
            Self::Hour => 'h',
            Self::Day => 'd',
        }
    }
}

/// A bar frequency in `<positive integer><unit>` form, e.g. `1m`, `13m`, `1d`.
///
/// `1m`/`1h`/`1d` are the *base* frequencies natively held by a store; any
/// other multiple is an *odd* frequency that must be resampled from a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frequency {
    number: u32,
    unit: FreqUnit,
}

impl Frequency {
    /// Build a frequency from a multiple and a unit.
    ///
    /// # Errors
    /// Returns `KbarsError::InvalidArg` when `number` is zero.
    pub fn new(number: u32, unit: FreqUnit) -> Result<Self, KbarsError> {
        if number == 0 {
            return Err(KbarsError::InvalidArg(
                "frequency multiple must be positive".into(),
            ));
        }
        Ok(Self { number, unit })
    }

    /// `N`-minute bars.
    ///
    /// # Errors
    /// Returns `KbarsError::InvalidArg` when `number` is zero.
    pub fn minutes(number: u32) -> Result<Self, KbarsError> {
        Self::new(number, FreqUnit::Minute)
    }

    /// The frequency multiple.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// The frequency unit.
    #[must_use]
    pub const fn unit(&self) -> FreqUnit {
        self.unit
    }

    /// Whether this is a base frequency (`1m`, `1h` or `1d`).
    #[must_use]
    pub const fn is_base(&self) -> bool {
        self.number == 1
    }

    /// The base frequency of the same unit (`13m` -> `1m`).
    #[must_use]
    pub const fn base(&self) -> Self {
        Self {
            number: 1,
            unit: self.unit,
        }
    }

    /// Bucket width in minutes, for intraday units only.
    #[must_use]
    pub const fn step_minutes(&self) -> Option<i64> {
        match self.unit {
            FreqUnit::Minute => Some(self.number as i64),
            FreqUnit::Hour => Some(self.number as i64 * 60),
            FreqUnit::Day => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.unit.suffix())
    }
}

impl FromStr for Frequency {
    type Err = KbarsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KbarsError::InvalidArg(format!("invalid frequency: {s:?}"));
        let unit = match s.chars().last() {
            Some('m') => FreqUnit::Minute,
            Some('h') => FreqUnit::Hour,
            Some('d') => FreqUnit::Day,
            _ => return Err(invalid()),
        };
        let number: u32 = s[..s.len() - 1].parse().map_err(|_| invalid())?;
        Self::new(number, unit)
    }
}
