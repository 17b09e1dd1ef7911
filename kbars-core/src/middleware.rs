//! Middleware trait for wrapping `BarSource` implementations.

use std::sync::Arc;

use crate::source::BarSource;

/// Trait implemented by bar-source middleware layers.
///
/// A middleware consumes an inner `BarSource` and returns a wrapped source
/// that augments behavior (e.g., the sliding-window cache).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner source and return the wrapped source.
    fn apply(self: Box<Self>, inner: Arc<dyn BarSource>) -> Arc<dyn BarSource>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
