use std::sync::Arc;

use kbars_core::{BarSource, Middleware};
use kbars_types::CacheConfig;
use tracing::debug;

use crate::cache::CacheMiddleware;

/// Composes middleware onto a base [`BarSource`].
///
/// Middleware are applied in registration order, innermost first: the first
/// `with` call wraps the base source directly and the last one ends up
/// outermost.
pub struct SourceBuilder {
    inner: Arc<dyn BarSource>,
    middlewares: Vec<Box<dyn Middleware>>,
}

impl SourceBuilder {
    /// Start a stack from a base source.
    #[must_use]
    pub fn new(inner: Arc<dyn BarSource>) -> Self {
        Self {
            inner,
            middlewares: Vec::new(),
        }
    }

    /// Register a middleware layer.
    #[must_use]
    pub fn with(mut self, middleware: Box<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Register the sliding-window cache.
    #[must_use]
    pub fn with_cache(self, cfg: CacheConfig) -> Self {
        self.with(Box::new(CacheMiddleware::new(cfg)))
    }

    /// Apply every registered middleware and return the assembled source.
    #[must_use]
    pub fn build(self) -> Arc<dyn BarSource> {
        let mut source = self.inner;
        for middleware in self.middlewares {
            debug!(layer = middleware.name(), "applying middleware");
            source = middleware.apply(source);
        }
        source
    }
}
