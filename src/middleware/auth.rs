//! Bearer token consumption.
//!
//! Token issuance happens elsewhere; this middleware only validates a
//! presented token and sets the context's authenticated-identity flag.
//! Requests without an Authorization header stay anonymous and continue.

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::{Middleware, Next};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct BearerAuth;

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        if let Some(header) = ctx.request.header("authorization") {
            let token = extract_bearer(header).map_err(ApiError::unauthorized)?;
            let claims = validate_token(&token).map_err(ApiError::unauthorized)?;
            ctx.authenticated = true;
            ctx.subject = Some(claims.sub);
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "auth"
    }
}

fn extract_bearer(header: &str) -> Result<String, String> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

fn validate_token(token: &str) -> Result<Claims, String> {
    let secret = &crate::config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err("token validation not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("invalid token: {}", e))?;

    Ok(token_data.claims)
}

/// Reject the request unless the authenticated-identity flag is set.
pub fn require_auth(ctx: &RequestContext) -> Result<(), ApiError> {
    if ctx.authenticated {
        Ok(())
    } else {
        Err(ApiError::unauthorized("authentication required"))
    }
}

/// Issue a token for `sub`, valid for an hour. Test and tooling helper; the
/// service itself never issues tokens.
pub fn issue_token(sub: &str) -> Result<String, ApiError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let secret = &crate::config::config().security.jwt_secret;
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("token encoding failed: {}", e);
        ApiError::internal_server_error(crate::error::INTERNAL_ERROR_MESSAGE)
    })
}
