//! Response contract enforcement.
//!
//! Inspects the accumulated body exactly once, after the terminal handler
//! and all inner middleware have run. Only marker-carrying values and the
//! bypass capsule may cross the network boundary; anything else fails the
//! request. This is a development-time safety net: an unapproved body is a
//! programming defect, not a request-state failure.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::response::{serialize_approved, Body};

pub struct ContractEnforcement;

#[async_trait]
impl Middleware for ContractEnforcement {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        next.run(ctx).await?;

        match ctx.response.body.take() {
            Some(Body::Approved(value)) => {
                let payload = serialize_approved(value.as_ref())?;
                ctx.response.payload = Some(payload);
                ctx.response
                    .set_header("Content-Type", "application/json; charset=UTF-8");
                Ok(())
            }
            Some(Body::Bypass(payload)) => {
                ctx.response.payload = Some(payload);
                ctx.response
                    .set_header("Content-Type", "application/json; charset=UTF-8");
                Ok(())
            }
            Some(Body::Unchecked { type_name, .. }) => {
                tracing::error!("unapproved response body reached the contract boundary: {}", type_name);
                Err(ApiError::internal_server_error(format!(
                    "unapproved response type: {}",
                    type_name
                )))
            }
            // Absent body (204-style) passes through unchanged.
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "contract"
    }
}
