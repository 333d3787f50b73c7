#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;

use atlas_api::app::{App, AppOptions};
use atlas_api::http::{Bindings, Request};
use atlas_api::identity::HashedIdentity;
use atlas_api::store::{KvStore, MemoryStore};

pub fn test_bindings() -> (Bindings, Arc<MemoryStore>) {
    let entries = Arc::new(MemoryStore::new(100));
    let bindings = Bindings::new(Arc::new(HashedIdentity::new("test-salt")))
        .with_namespace("entries", entries.clone());
    (bindings, entries)
}

pub fn app_without_rate_limiting(bindings: Bindings) -> App {
    App::with_options(Arc::new(bindings), AppOptions { rate_limiting: false })
}

pub fn app_with_rate_limiting(bindings: Bindings) -> App {
    App::with_options(Arc::new(bindings), AppOptions { rate_limiting: true })
}

pub async fn seed_entry(store: &dyn KvStore, id: &str, display_name: &str, tags: &[&str]) {
    let value = json!({
        "recordKey": format!("kv:{}", id),
        "id": id,
        "displayName": display_name,
        "tags": tags,
    });
    store
        .put(&format!("entry:{}", id), &value.to_string())
        .await
        .expect("seed entry");
}

pub fn anonymous(request: Request) -> Request {
    request.with_caller("203.0.113.7")
}

pub fn bearer(request: Request, token: &str) -> Request {
    request.with_header("authorization", format!("Bearer {}", token))
}
