//! kbars-middleware
//!
//! Bar-source middleware: the sliding-window bar cache and the stack
//! builder that composes middleware onto a base source.
#![warn(missing_docs)]

mod builder;
mod cache;

pub use crate::builder::SourceBuilder;
pub use crate::cache::{CacheMiddleware, CachingSource};
