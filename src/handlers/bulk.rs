//! Bulk dataset endpoints used by the sync job.
//!
//! Both operations are authenticated and go through the same chain as
//! ordinary traffic, so a sync run exercises the contract and rate-limit
//! rules rather than bypassing them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::approve_response;
use crate::error::ApiError;
use crate::http::RequestContext;
use crate::middleware::auth::require_auth;
use crate::store::list_all_keys;

#[derive(Debug, Serialize)]
pub struct BulkKeyList {
    pub dataset: String,
    pub keys: Vec<String>,
}

approve_response!(BulkKeyList);

#[derive(Debug, Serialize)]
pub struct BulkValues {
    pub dataset: String,
    pub values: BTreeMap<String, String>,
}

approve_response!(BulkValues);

#[derive(Debug, Deserialize)]
struct ChunkRequest {
    keys: Vec<String>,
}

/// GET /api/bulk/:dataset/keys - complete key list for a named dataset
pub async fn keys(ctx: &mut RequestContext) -> Result<(), ApiError> {
    require_auth(ctx)?;

    let dataset = ctx.param("dataset")?.to_string();
    let store = ctx.bindings.namespace(&dataset)?;
    let keys = list_all_keys(store.as_ref(), None).await?;

    tracing::debug!(dataset = %dataset, count = keys.len(), "bulk key listing");
    ctx.respond(BulkKeyList { dataset, keys });
    Ok(())
}

/// POST /api/bulk/:dataset/values - values for one chunk of keys
pub async fn values(ctx: &mut RequestContext) -> Result<(), ApiError> {
    require_auth(ctx)?;

    let dataset = ctx.param("dataset")?.to_string();
    let body = ctx
        .request
        .body
        .clone()
        .ok_or_else(|| ApiError::bad_request("request body required"))?;
    let request: ChunkRequest = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("body must be { \"keys\": [...] }"))?;

    let max = crate::config::config().api.max_chunk_items;
    if request.keys.len() > max {
        return Err(ApiError::bad_request(format!(
            "chunk exceeds maximum of {} keys",
            max
        )));
    }

    let store = ctx.bindings.namespace(&dataset)?;
    let mut values = BTreeMap::new();
    for key in &request.keys {
        if let Some(value) = store.get(key).await? {
            values.insert(key.clone(), value);
        }
    }

    tracing::debug!(dataset = %dataset, requested = request.keys.len(), found = values.len(), "bulk value fetch");
    ctx.respond(BulkValues { dataset, values });
    Ok(())
}
