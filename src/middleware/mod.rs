//! Middleware chain composition.
//!
//! A chain is an ordered stack of middleware around a terminal handler.
//! Pre-processing runs in registration order, post-processing in reverse:
//! the first-registered middleware sees the request first and the response
//! last. A middleware either short-circuits (returns without consuming its
//! continuation), continues inward exactly once, or continues and then
//! post-processes the accumulated response.

pub mod auth;
pub mod contract;
pub mod errors;
pub mod headers;
pub mod rate_limit;

pub use auth::BearerAuth;
pub use contract::ContractEnforcement;
pub use errors::ErrorNormalization;
pub use headers::DefaultHeaders;
pub use rate_limit::RateLimit;

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::{ApiError, NESTED_MIDDLEWARE_FAILURE};
use crate::http::RequestContext;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError>;

    fn name(&self) -> &'static str {
        "middleware"
    }
}

/// Terminal request handler at the center of the chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Result<(), ApiError>;
}

/// Continuation into the rest of the chain. Consumed by value, so a
/// middleware can invoke it at most once; dropping it without running is a
/// short-circuit.
pub struct Next<'a> {
    chain: &'a Chain,
    index: usize,
}

impl Next<'_> {
    pub async fn run(self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        match self.chain.stack.get(self.index) {
            Some(middleware) => {
                tracing::trace!("entering middleware '{}'", middleware.name());
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                };
                middleware.handle(ctx, next).await
            }
            None => self.chain.handler.call(ctx).await,
        }
    }
}

pub struct Chain {
    stack: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl Chain {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            stack: Vec::new(),
            handler,
        }
    }

    /// Register a middleware. The first registration becomes the outermost
    /// layer of the onion.
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.stack.push(middleware);
        self
    }

    /// Run the chain for one request.
    ///
    /// The terminal handler runs exactly once unless a middleware
    /// short-circuits. A middleware that panics while the chain is being
    /// applied is a configuration bug, not a request failure: the caller
    /// gets the fixed nested-failure response instead of a hang, and the
    /// condition is terminal and non-retryable.
    pub async fn run(&self, ctx: &mut RequestContext) {
        let first = Next {
            chain: self,
            index: 0,
        };

        let outcome = std::panic::AssertUnwindSafe(first.run(ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                // An error escaped the chain without a normalizer in place.
                // Normalize here so no request ever ends without an envelope.
                tracing::error!(
                    "error escaped the middleware chain (no normalizer registered): {}",
                    err
                );
                errors::write_error_response(ctx, &err);
            }
            Err(_panic) => {
                tracing::error!("panic while applying middleware chain");
                let err = ApiError::internal_server_error(NESTED_MIDDLEWARE_FAILURE);
                errors::write_error_response(ctx, &err);
            }
        }
    }
}
