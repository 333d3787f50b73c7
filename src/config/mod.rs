use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Requests admitted past the threshold before rejection kicks in.
    pub rate_limit_burst: u32,
    /// Service-enforced maximum keys per bulk value-fetch request.
    pub max_chunk_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound on keys returned by one list call; callers paginate.
    pub list_page_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Keys per value-fetch call. Low hundreds balances request count
    /// against per-request payload limits.
    pub chunk_size: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    /// Salt mixed into anonymous identity derivation.
    pub identity_salt: String,
    pub cors_max_age_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs =
                v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_BURST") {
            self.api.rate_limit_burst = v.parse().unwrap_or(self.api.rate_limit_burst);
        }
        if let Ok(v) = env::var("API_MAX_CHUNK_ITEMS") {
            self.api.max_chunk_items = v.parse().unwrap_or(self.api.max_chunk_items);
        }

        // Store overrides
        if let Ok(v) = env::var("STORE_LIST_PAGE_LIMIT") {
            self.store.list_page_limit = v.parse().unwrap_or(self.store.list_page_limit);
        }

        // Sync overrides
        if let Ok(v) = env::var("SYNC_CHUNK_SIZE") {
            self.sync.chunk_size = v.parse().unwrap_or(self.sync.chunk_size);
        }
        if let Ok(v) = env::var("SYNC_REQUEST_TIMEOUT_SECS") {
            self.sync.request_timeout_secs =
                v.parse().unwrap_or(self.sync.request_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_IDENTITY_SALT") {
            self.security.identity_salt = v;
        }
        if let Ok(v) = env::var("SECURITY_CORS_MAX_AGE_SECS") {
            self.security.cors_max_age_secs =
                v.parse().unwrap_or(self.security.cors_max_age_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                rate_limit_burst: 0,
                max_chunk_items: 128,
            },
            store: StoreConfig { list_page_limit: 1000 },
            sync: SyncConfig {
                chunk_size: 128,
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                identity_salt: "dev-salt".to_string(),
                cors_max_age_secs: 86400,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
                rate_limit_burst: 0,
                max_chunk_items: 128,
            },
            store: StoreConfig { list_page_limit: 1000 },
            sync: SyncConfig {
                chunk_size: 128,
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                identity_salt: String::new(),
                cors_max_age_secs: 86400,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 60,
                rate_limit_window_secs: 60,
                rate_limit_burst: 0,
                max_chunk_items: 128,
            },
            store: StoreConfig { list_page_limit: 1000 },
            sync: SyncConfig {
                chunk_size: 128,
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                identity_salt: String::new(),
                cors_max_age_secs: 86400,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
