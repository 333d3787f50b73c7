//! Anonymous identity derivation for rate-limit keying.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Collaborator yielding a stable opaque token per anonymous caller. The
/// token is derived once per caller and reused across requests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identifier(&self, caller: &str) -> Result<String, ApiError>;
}

/// SHA-256 of a configured salt plus the caller address, hex encoded.
/// Stable for a given caller, not reversible to the address.
pub struct HashedIdentity {
    salt: String,
    cache: RwLock<HashMap<String, String>>,
}

impl HashedIdentity {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config() -> Self {
        Self::new(crate::config::config().security.identity_salt.clone())
    }

    fn derive(&self, caller: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(caller.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[async_trait]
impl IdentityProvider for HashedIdentity {
    async fn identifier(&self, caller: &str) -> Result<String, ApiError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(token) = cache.get(caller) {
                return Ok(token.clone());
            }
        }

        let token = self.derive(caller);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(caller.to_string(), token.clone());
        }
        Ok(token)
    }
}
