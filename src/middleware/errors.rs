//! Outermost error normalization.
//!
//! Every failure flowing back through the chain is classified: its status
//! and body are copied verbatim into the response and any headers set by
//! the failed path are discarded. Internal classifications carry only the
//! generic message; the detail has already gone to diagnostics at the point
//! of coercion.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::{Middleware, Next};

pub struct ErrorNormalization;

#[async_trait]
impl Middleware for ErrorNormalization {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        if let Err(err) = next.run(ctx).await {
            match &err {
                ApiError::InternalServerError(msg) => {
                    tracing::error!(status = err.status_code(), "request failed: {}", msg);
                }
                _ => {
                    tracing::debug!(status = err.status_code(), "request rejected: {}", err);
                }
            }
            write_error_response(ctx, &err);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "errors"
    }
}

/// Replace the accumulated response with the error envelope. Headers are
/// reset to a clean slate so partial state from a failed handler never
/// reaches the caller.
pub fn write_error_response(ctx: &mut RequestContext, err: &ApiError) {
    ctx.response.reset_headers();
    ctx.response.status = err.status_code();
    ctx.response.body = None;
    ctx.response.payload = Some(err.to_json());
    ctx.response
        .set_header("Content-Type", "application/json; charset=UTF-8");
}

/// Guarantee that every failure surfacing from `op` is an [`ApiError`].
///
/// Boundaries that require a specific error type wrap their calls in this:
/// classified failures pass through, anything else is re-wrapped as an
/// internal classification with the original retained for diagnostics only.
pub async fn normalize_boundary<T, E, F>(op: F) -> Result<T, ApiError>
where
    E: std::fmt::Display,
    F: std::future::Future<Output = Result<T, E>>,
{
    op.await.map_err(ApiError::coerce)
}
