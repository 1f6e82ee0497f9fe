use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::config::{CacheConfig, FeaturesConfig, PaginationConfig};

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseConnection,
    pub cache: Arc<ApiCache>,
    pub features: Arc<FeaturesConfig>,
    pub pagination: PaginationConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        database: DatabaseConnection,
        cache: Arc<ApiCache>,
        features: FeaturesConfig,
        pagination: PaginationConfig,
    ) -> Self {
        assert!(
            pagination.max_page_size >= pagination.default_page_size,
            "Pagination bounds must be validated before state construction"
        );
        Self {
            database,
            cache,
            features: Arc::new(features),
            pagination,
            start_time: Instant::now(),
        }
    }
}

/// Read-through caches keyed by filter-set strings. Invalidation is
/// wholesale per write: the dataset is small, so correctness beats
/// precision here. The cache is an optimization only; with `enabled`
/// off every read goes to the store and behavior is unchanged.
pub struct ApiCache {
    pub requests: Cache<String, Value>,
    pub statistics: Cache<String, Value>,
    pub categories: Cache<String, Value>,
    enabled: bool,
}

impl ApiCache {
    pub fn new(config: &CacheConfig) -> Self {
        assert!(
            config.requests_max_capacity >= 10,
            "Request cache capacity threshold"
        );

        let requests = Cache::builder()
            .max_capacity(config.requests_max_capacity)
            .time_to_live(Duration::from_secs(config.requests_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.requests_ttl_seconds / 2 + 1))
            .build();

        let statistics = Cache::builder()
            .max_capacity(config.statistics_max_capacity)
            .time_to_live(Duration::from_secs(config.statistics_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.statistics_ttl_seconds / 2 + 1))
            .build();

        let categories = Cache::builder()
            .max_capacity(config.categories_max_capacity)
            .time_to_live(Duration::from_secs(config.categories_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.categories_ttl_seconds / 2 + 1))
            .build();

        Self {
            requests,
            statistics,
            categories,
            enabled: config.enabled,
        }
    }

    pub async fn get(&self, cache: &Cache<String, Value>, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        cache.get(key).await
    }

    pub async fn insert(&self, cache: &Cache<String, Value>, key: String, value: Value) {
        if !self.enabled {
            return;
        }
        cache.insert(key, value).await;
    }

    /// Called after any committed write to feature requests, votes,
    /// comments, or categories.
    pub fn invalidate_domain(&self) {
        self.requests.invalidate_all();
        self.statistics.invalidate_all();
        self.categories.invalidate_all();
    }

    pub fn entry_counts(&self) -> (u64, u64, u64) {
        (
            self.requests.entry_count(),
            self.statistics.entry_count(),
            self.categories.entry_count(),
        )
    }
}
