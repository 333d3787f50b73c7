//! Opaque key-value store collaborator.
//!
//! The service treats persistence as an external resource with a narrow
//! operation set. Listing is paginated: one call returns at most the store's
//! page limit and a cursor; callers loop until exhausted.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a key listing. `cursor` is `None` when the listing is
/// exhausted; otherwise pass it back to continue.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn put_bulk(&self, pairs: &[(String, String)]) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn delete_bulk(&self, keys: &[String]) -> StoreResult<()>;

    async fn list_keys(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ListPage>;
}

/// Drain the paginated listing until the cursor is exhausted.
pub async fn list_all_keys(
    store: &dyn KvStore,
    prefix: Option<&str>,
) -> StoreResult<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.list_keys(prefix, cursor.as_deref()).await?;
        keys.extend(page.keys);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(keys)
}
