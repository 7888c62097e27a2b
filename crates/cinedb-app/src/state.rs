use std::{sync::Arc, time::Duration};

use cinedb_dal::Pool;
use cinedb_store::StorageBackend;
use url::Url;

use crate::{
    cache::OutputCache,
    error::{ApiError, ApiResult},
    retry::RetryPolicy,
};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, storage: StorageBackend) -> Self {
        let cache = OutputCache::new(app_config.cache_ttl);
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                storage,
                cache,
                app_config,
            }),
        }
    }

    pub fn get_app_config(&self) -> &AppConfig {
        &self.state.app_config
    }

    /// Absolute URL of the resource, relative to configured base URL
    pub fn build_url(&self, relative_url: &str) -> ApiResult<Url> {
        let base = &self.get_app_config().base_url;
        base.join(relative_url)
            .map_err(|e| ApiError::InternalError(format!("Cannot build URL {relative_url}: {e}")))
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn storage(&self) -> &StorageBackend {
        &self.state.storage
    }

    pub fn cache(&self) -> &OutputCache {
        &self.state.cache
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.state.app_config.retry
    }
}

struct AppStateInner {
    pool: Pool,
    storage: StorageBackend,
    cache: OutputCache,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub base_url: Url,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}
