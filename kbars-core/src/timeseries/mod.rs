//! Pure time-series math: trading-session indexing and bar resampling.
//!
//! Nothing in this module suspends; everything here is deterministic
//! calendar and bucket arithmetic used by the decorators in the crate root.

pub mod resample;
pub mod session;
