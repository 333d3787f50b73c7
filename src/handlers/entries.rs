//! Entry resource.

use serde::{Deserialize, Serialize};

use crate::approve_response;
use crate::error::ApiError;
use crate::filter::Keyed;
use crate::http::RequestContext;

/// Storage key prefix for entries in their namespace.
pub const KEY_PREFIX: &str = "entry:";

/// A published entry. `record_key` is the persistence-layer identifier and
/// stays off the wire; the exposure list names everything that may leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub record_key: String,
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

approve_response!(Entry, fields = ["id", "displayName", "tags"]);

impl Keyed for Entry {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Entry {
    pub fn storage_key(id: &str) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }

    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        // Corrupt stored data is an internal defect, not a caller problem.
        serde_json::from_str(raw).map_err(ApiError::from)
    }
}

/// GET /api/entries/:id - fetch one entry
pub async fn get(ctx: &mut RequestContext) -> Result<(), ApiError> {
    let id = ctx.param("id")?.to_string();
    let store = ctx.bindings.namespace("entries")?;

    let raw = store
        .get(&Entry::storage_key(&id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("entry not found: {}", id)))?;

    let entry = Entry::parse(&raw)?;
    ctx.respond(entry);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::serialize_approved;

    #[test]
    fn wire_shape_excludes_record_key() {
        let entry = Entry {
            record_key: "kv:abc".into(),
            id: "abc".into(),
            display_name: "Sample".into(),
            tags: vec!["demo".into()],
        };
        let value = serialize_approved(&entry).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["displayName"], "Sample");
        assert!(value.get("recordKey").is_none());
    }
}
