//! Default response headers.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::{Middleware, Next};

/// Attaches the CORS defaults to every response after the inner chain has
/// run. Registered inside the error normalizer, so error envelopes get a
/// clean slate instead of these.
pub struct DefaultHeaders;

#[async_trait]
impl Middleware for DefaultHeaders {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        next.run(ctx).await?;

        let max_age = crate::config::config().security.cors_max_age_secs;
        ctx.response.set_header("Access-Control-Allow-Origin", "*");
        ctx.response
            .set_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS");
        ctx.response
            .set_header("Access-Control-Max-Age", max_age.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "headers"
    }
}
