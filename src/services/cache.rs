use super::{PictureResolver, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Caching decorator for any picture resolver
///
/// Successful resolutions are kept in an in-memory moka cache so reloading
/// the feed does not hit the backend again for pictures it has already seen.
/// Failures are never cached.
pub struct CachingPictureResolver {
    inner: Arc<dyn PictureResolver>,
    cache: moka::future::Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachingPictureResolver {
    pub fn new(inner: Arc<dyn PictureResolver>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Drop every cached URL
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        tracing::debug!("Invalidated picture cache");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            size: self.cache.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
        }
    }
}

#[async_trait]
impl PictureResolver for CachingPictureResolver {
    async fn resolve(&self, profile_id: &str, picture_name: &str) -> Result<String, ServiceError> {
        let key = CacheKey::picture(profile_id, picture_name);

        if let Some(url) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Picture cache hit: {}", key);
            return Ok(url);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Picture cache miss: {}", key);

        let url = self.inner.resolve(profile_id, picture_name).await?;
        self.cache.insert(key, url.clone()).await;
        Ok(url)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a resolved profile picture
    pub fn picture(profile_id: &str, picture_name: &str) -> String {
        format!("picture:{}:{}", profile_id, picture_name)
    }
}
