pub mod bulk;
pub mod entries;
pub mod search;

use serde::Serialize;
use serde_json::{json, Value};

use crate::approve_response;
use crate::error::ApiError;
use crate::http::RequestContext;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Value,
}

approve_response!(ServiceInfo);

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

approve_response!(HealthStatus);

/// GET / - service info
pub async fn root(ctx: &mut RequestContext) -> Result<(), ApiError> {
    ctx.respond(ServiceInfo {
        name: "Atlas API",
        version: env!("CARGO_PKG_VERSION"),
        description: "Public data service backend",
        endpoints: json!({
            "home": "/ (public)",
            "health": "/health (public)",
            "entries": "/api/entries/:id (public)",
            "search": "/api/search (public)",
            "bulk": "/api/bulk/:dataset/keys, /api/bulk/:dataset/values (authenticated)",
        }),
    });
    Ok(())
}

/// GET /health - liveness plus a storage probe
pub async fn health(ctx: &mut RequestContext) -> Result<(), ApiError> {
    let store = ctx.bindings.namespace("entries")?;
    if let Err(e) = store.list_keys(None, None).await {
        tracing::error!("health probe failed: {}", e);
        return Err(ApiError::service_unavailable("storage unavailable"));
    }

    ctx.respond(HealthStatus {
        status: "ok",
        timestamp: chrono::Utc::now(),
    });
    Ok(())
}
