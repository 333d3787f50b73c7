//! In-memory store used by tests and local development.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{KvStore, ListPage, StoreError, StoreResult};

/// BTreeMap-backed store. Ordered keys give the cursor a stable meaning:
/// the cursor is the last key of the previous page.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    page_limit: usize,
}

impl MemoryStore {
    pub fn new(page_limit: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            page_limit: page_limit.max(1),
        }
    }

    fn lock_err() -> StoreError {
        StoreError::Backend("store lock poisoned".to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::config::config().store.list_page_limit)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| Self::lock_err())?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_bulk(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        for (key, value) in pairs {
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        entries.remove(key);
        Ok(())
    }

    async fn delete_bulk(&self, keys: &[String]) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn list_keys(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ListPage> {
        let entries = self.entries.read().map_err(|_| Self::lock_err())?;
        let prefix = prefix.unwrap_or("");

        let keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| match cursor {
                Some(cursor) => k.as_str() > cursor,
                None => true,
            })
            .take(self.page_limit + 1)
            .cloned()
            .collect();

        if keys.len() > self.page_limit {
            let page: Vec<String> = keys.into_iter().take(self.page_limit).collect();
            let cursor = page.last().cloned();
            Ok(ListPage { keys: page, cursor })
        } else {
            Ok(ListPage { keys, cursor: None })
        }
    }
}
