mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::json;

use atlas_api::app::{App, PUBLIC_API_COUNTER};
use atlas_api::http::Request;
use atlas_api::limiter::WindowCounter;
use atlas_api::middleware::auth::issue_token;
use atlas_api::store::{list_all_keys, KvStore, MemoryStore};
use atlas_api::sync::{BulkApi, SyncError, SyncJob};

/// Client that drives the assembled app in-process, so sync traffic passes
/// through the same middleware chain as any other request.
struct InProcessClient {
    app: Arc<App>,
    token: Option<String>,
}

impl InProcessClient {
    fn request(&self, method: Method, path: String) -> Request {
        let request = Request::new(method, path).with_caller("203.0.113.50");
        match &self.token {
            Some(token) => request.with_header("authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl BulkApi for InProcessClient {
    async fn list_keys(&self, dataset: &str) -> Result<Vec<String>, SyncError> {
        let parts = self
            .app
            .dispatch(self.request(Method::GET, format!("/api/bulk/{}/keys", dataset)))
            .await;
        let payload = parts.payload.unwrap_or_default();
        if parts.status != 200 {
            return Err(SyncError::Api {
                status: parts.status,
                message: payload["message"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        serde_json::from_value(payload["keys"].clone()).map_err(|e| SyncError::Api {
            status: 500,
            message: e.to_string(),
        })
    }

    async fn fetch_values(
        &self,
        dataset: &str,
        keys: &[String],
    ) -> Result<HashMap<String, String>, SyncError> {
        let request = self
            .request(Method::POST, format!("/api/bulk/{}/values", dataset))
            .with_body(json!({ "keys": keys }));
        let parts = self.app.dispatch(request).await;
        let payload = parts.payload.unwrap_or_default();
        if parts.status != 200 {
            return Err(SyncError::Api {
                status: parts.status,
                message: payload["message"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        serde_json::from_value(payload["values"].clone()).map_err(|e| SyncError::Api {
            status: 500,
            message: e.to_string(),
        })
    }
}

/// Fails the nth value-fetch call, after which no further calls matter.
struct Flaky<A> {
    inner: A,
    fail_on_call: u32,
    calls: Mutex<u32>,
}

#[async_trait]
impl<A: BulkApi> BulkApi for Flaky<A> {
    async fn list_keys(&self, dataset: &str) -> Result<Vec<String>, SyncError> {
        self.inner.list_keys(dataset).await
    }

    async fn fetch_values(
        &self,
        dataset: &str,
        keys: &[String],
    ) -> Result<HashMap<String, String>, SyncError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call == self.fail_on_call {
            return Err(SyncError::Api {
                status: 502,
                message: "upstream chunk fetch failed".to_string(),
            });
        }
        self.inner.fetch_values(dataset, keys).await
    }
}

async fn source_app(dataset: &str, key_count: usize) -> App {
    let (bindings, _) = common::test_bindings();
    let catalog = Arc::new(MemoryStore::new(100));
    for i in 0..key_count {
        catalog
            .put(&format!("item-{:02}", i), &format!("value-{:02}", i))
            .await
            .expect("seed");
    }
    common::app_without_rate_limiting(bindings.with_namespace(dataset, catalog))
}

#[tokio::test]
async fn full_sync_replaces_destination_contents() -> Result<()> {
    let app = Arc::new(source_app("catalog", 10).await);
    let client = InProcessClient {
        app,
        token: Some(issue_token("sync-job")?),
    };

    let dest_a: Arc<MemoryStore> = Arc::new(MemoryStore::new(100));
    let dest_b: Arc<MemoryStore> = Arc::new(MemoryStore::new(100));
    dest_a.put("stale-key", "stale").await?;

    let job = SyncJob::new(Arc::new(client), 3)
        .with_destination("mirror-a", dest_a.clone())
        .with_destination("mirror-b", dest_b.clone());

    let report = job.run("catalog").await?;
    assert_eq!(report.keys_synced, 10);
    assert_eq!(report.chunks, 4);
    assert_eq!(report.destinations, vec!["mirror-a", "mirror-b"]);

    for dest in [&dest_a, &dest_b] {
        let keys = list_all_keys(dest.as_ref(), None).await?;
        assert_eq!(keys.len(), 10);
        assert_eq!(
            dest.get("item-07").await?,
            Some("value-07".to_string())
        );
    }
    assert_eq!(dest_a.get("stale-key").await?, None, "full replace, not merge");
    Ok(())
}

#[tokio::test]
async fn chunk_fetch_failure_aborts_before_any_write() -> Result<()> {
    let app = Arc::new(source_app("catalog", 10).await);
    let client = Flaky {
        inner: InProcessClient {
            app,
            token: Some(issue_token("sync-job")?),
        },
        fail_on_call: 2,
        calls: Mutex::new(0),
    };

    let dest: Arc<MemoryStore> = Arc::new(MemoryStore::new(100));
    dest.put("pre-sync-key", "stale").await?;

    let job = SyncJob::new(Arc::new(client), 3).with_destination("mirror", dest.clone());
    let outcome = job.run("catalog").await;

    assert!(matches!(outcome, Err(SyncError::Api { status: 502, .. })));

    // Documented outcome: the destructive delete already ran, the write
    // never started. The destination may end up empty; that is accepted.
    let keys = list_all_keys(dest.as_ref(), None).await?;
    assert!(keys.is_empty());
    Ok(())
}

#[tokio::test]
async fn unauthenticated_sync_is_rejected_by_the_api() -> Result<()> {
    let app = Arc::new(source_app("catalog", 4).await);
    let client = InProcessClient { app, token: None };

    let dest: Arc<MemoryStore> = Arc::new(MemoryStore::new(100));
    let job = SyncJob::new(Arc::new(client), 2).with_destination("mirror", dest);

    let outcome = job.run("catalog").await;
    assert!(matches!(outcome, Err(SyncError::Api { status: 401, .. })));
    Ok(())
}

#[tokio::test]
async fn sync_traffic_bypasses_the_anonymous_limiter() -> Result<()> {
    let (bindings, _) = common::test_bindings();
    let catalog = Arc::new(MemoryStore::new(100));
    for i in 0..10 {
        catalog
            .put(&format!("item-{:02}", i), &format!("value-{:02}", i))
            .await?;
    }
    let bindings = bindings.with_namespace("catalog", catalog).with_counter(
        PUBLIC_API_COUNTER,
        Arc::new(WindowCounter::new(1, 0, Duration::from_secs(60))),
    );
    let app = Arc::new(common::app_with_rate_limiting(bindings));

    // One key list plus five chunk fetches is well past the threshold; the
    // authenticated job must not be limited.
    let client = InProcessClient {
        app,
        token: Some(issue_token("sync-job")?),
    };
    let dest: Arc<MemoryStore> = Arc::new(MemoryStore::new(100));
    let job = SyncJob::new(Arc::new(client), 2).with_destination("mirror", dest.clone());

    let report = job.run("catalog").await?;
    assert_eq!(report.keys_synced, 10);
    assert_eq!(report.chunks, 5);
    Ok(())
}

#[tokio::test]
async fn oversized_chunks_are_rejected_by_the_api() -> Result<()> {
    let app = source_app("catalog", 1).await;
    let token = issue_token("sync-job")?;

    let max = atlas_api::config::config().api.max_chunk_items;
    let keys: Vec<String> = (0..max + 1).map(|i| format!("k{}", i)).collect();
    let request = common::bearer(
        Request::new(Method::POST, "/api/bulk/catalog/values")
            .with_caller("203.0.113.50")
            .with_body(json!({ "keys": keys })),
        &token,
    );

    let parts = app.dispatch(request).await;
    assert_eq!(parts.status, 400);
    Ok(())
}
