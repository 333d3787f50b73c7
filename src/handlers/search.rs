//! Tag search over entries.
//!
//! Each requested tag produces an independent result set; the intersection
//! filter narrows them to entries matching every tag, with near-misses
//! reported separately.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::approve_response;
use crate::error::ApiError;
use crate::filter::intersect_groups;
use crate::handlers::entries::{Entry, KEY_PREFIX};
use crate::http::RequestContext;
use crate::response::serialize_approved;
use crate::store::list_all_keys;

#[derive(Debug, Deserialize)]
struct SearchRequest {
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<Value>,
    pub related: Vec<Value>,
}

approve_response!(SearchResults);

/// POST /api/search - entries matching every requested tag
pub async fn post(ctx: &mut RequestContext) -> Result<(), ApiError> {
    let body = ctx
        .request
        .body
        .clone()
        .ok_or_else(|| ApiError::bad_request("request body required"))?;
    let request: SearchRequest = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("body must be { \"tags\": [...] }"))?;

    if request.tags.is_empty() {
        return Err(ApiError::bad_request("at least one tag is required"));
    }

    let store = ctx.bindings.namespace("entries")?;
    let keys = list_all_keys(store.as_ref(), Some(KEY_PREFIX)).await?;

    let mut entries = Vec::with_capacity(keys.len());
    for key in &keys {
        if let Some(raw) = store.get(key).await? {
            entries.push(Entry::parse(&raw)?);
        }
    }

    // One independent collection per tag, in listing order.
    let groups: Vec<Vec<Entry>> = request
        .tags
        .iter()
        .map(|tag| {
            entries
                .iter()
                .filter(|e| e.tags.iter().any(|t| t == tag))
                .cloned()
                .collect()
        })
        .collect();

    let outcome = intersect_groups(groups);

    let results = expose_all(&outcome.intersect)?;
    let related = expose_all(&outcome.remainder)?;
    tracing::debug!(
        tags = request.tags.len(),
        results = results.len(),
        related = related.len(),
        "search complete"
    );

    ctx.respond(SearchResults { results, related });
    Ok(())
}

fn expose_all(entries: &[Entry]) -> Result<Vec<Value>, ApiError> {
    entries
        .iter()
        .map(|e| serialize_approved(e).map_err(ApiError::from))
        .collect()
}
