//! Anonymous rate limiting.
//!
//! Bound to a named counter and a route family. Authenticated callers skip
//! limiting entirely; anonymous callers are keyed by
//! `{route}_{anonymous identity}` against the counter's atomic
//! increment-and-check.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::{Middleware, Next};

pub struct RateLimit {
    counter: &'static str,
    route: String,
    path_prefix: String,
}

impl RateLimit {
    /// `counter` names the bound counter, `route` identifies the route
    /// family inside the key, `path_prefix` scopes which requests this
    /// limiter applies to within the single linear chain.
    pub fn new(counter: &'static str, route: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            counter,
            route: route.into(),
            path_prefix: path_prefix.into(),
        }
    }
}

#[async_trait]
impl Middleware for RateLimit {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        if !ctx.request.path.starts_with(&self.path_prefix) {
            return next.run(ctx).await;
        }

        // Privileged callers bypass limiting; no anonymous identity is
        // derived for them.
        if ctx.authenticated {
            return next.run(ctx).await;
        }

        let caller = ctx.request.caller.as_deref().unwrap_or("unknown");
        let identity = ctx.bindings.identity.identifier(caller).await?;
        let key = format!("{}_{}", self.route, identity);

        let counter = ctx.bindings.counter(self.counter)?;
        let outcome = counter.limit(&key).await?;
        if !outcome.success {
            tracing::info!(route = %self.route, "rate limit exceeded");
            return Err(ApiError::too_many_requests("rate limit exceeded"));
        }

        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "rate_limit"
    }
}
