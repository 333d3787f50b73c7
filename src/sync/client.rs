//! Scripted client for the bulk dataset API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::SyncError;

/// The two bulk operations the sync job needs. Implementations go through
/// the network-facing API, never directly at storage.
#[async_trait]
pub trait BulkApi: Send + Sync {
    async fn list_keys(&self, dataset: &str) -> Result<Vec<String>, SyncError>;

    async fn fetch_values(
        &self,
        dataset: &str,
        keys: &[String],
    ) -> Result<HashMap<String, String>, SyncError>;
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    values: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
    status: u16,
}

/// HTTP implementation over reqwest, authenticated with a bearer token.
pub struct HttpBulkClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpBulkClient {
    pub fn new(base_url: Url, token: impl Into<String>) -> Result<Self, SyncError> {
        let timeout = crate::config::config().sync.request_timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    fn endpoint(&self, dataset: &str, tail: &str) -> Result<Url, SyncError> {
        Ok(self
            .base_url
            .join(&format!("api/bulk/{}/{}", dataset, tail))?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let envelope: Result<ErrorEnvelope, _> = response.json().await;
        let message = match envelope {
            Ok(env) => env.message,
            Err(_) => "unreadable error response".to_string(),
        };
        Err(SyncError::Api { status, message })
    }
}

#[async_trait]
impl BulkApi for HttpBulkClient {
    async fn list_keys(&self, dataset: &str) -> Result<Vec<String>, SyncError> {
        let url = self.endpoint(dataset, "keys")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: KeysResponse = Self::check(response).await?.json().await?;
        Ok(body.keys)
    }

    async fn fetch_values(
        &self,
        dataset: &str,
        keys: &[String],
    ) -> Result<HashMap<String, String>, SyncError> {
        let url = self.endpoint(dataset, "values")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "keys": keys }))
            .send()
            .await?;
        let body: ValuesResponse = Self::check(response).await?.json().await?;
        Ok(body.values)
    }
}
