//! Secret resolution with a bounded freshness window.
//!
//! `SecretCache` wraps an external `SecretProvider` and keeps each resolved
//! value until it is older than `refresh_after` or explicitly invalidated.
//! The default window is 300 seconds.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// The default freshness window for cached secrets.
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(300);

/// Errors from secret resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret provider failed: {0}")]
    Provider(String),
}

/// The external secret/config provider.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, SecretError>;
}

/// A provider backed by process environment variables, for local runs.
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        std::env::var(name).map_err(|_| SecretError::NotFound(name.to_string()))
    }
}

struct CachedValue {
    value: String,
    fetched_at: Instant,
}

/// A lazily-populated, explicitly-invalidated secret cache.
pub struct SecretCache {
    provider: Box<dyn SecretProvider>,
    refresh_after: Duration,
    values: Mutex<HashMap<String, CachedValue>>,
}

impl SecretCache {
    pub fn new(provider: Box<dyn SecretProvider>) -> Self {
        Self {
            provider,
            refresh_after: DEFAULT_REFRESH_AFTER,
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Override the freshness window.
    pub fn with_refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    /// Resolve a secret, fetching from the provider only when the cached
    /// value is absent or older than the freshness window.
    pub async fn get(&self, name: &str) -> Result<String, SecretError> {
        let mut values = self.values.lock().await;

        if let Some(cached) = values.get(name) {
            if cached.fetched_at.elapsed() < self.refresh_after {
                return Ok(cached.value.clone());
            }
            debug!(secret = name, "Cached secret stale, refetching");
        }

        let value = self.provider.fetch(name).await?;
        values.insert(
            name.to_string(),
            CachedValue {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Drop the cached value so the next `get` refetches.
    pub async fn invalidate(&self, name: &str) {
        self.values.lock().await.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SecretProvider for CountingProvider {
        async fn fetch(&self, name: &str) -> Result<String, SecretError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(format!("value-of-{name}"))
        }
    }

    fn counting_cache() -> (SecretCache, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = SecretCache::new(Box::new(CountingProvider {
            fetches: fetches.clone(),
        }));
        (cache, fetches)
    }

    #[tokio::test]
    async fn fetches_once_within_freshness_window() {
        let (cache, fetches) = counting_cache();
        assert_eq!(cache.get("api-key").await.unwrap(), "value-of-api-key");
        assert_eq!(cache.get("api-key").await.unwrap(), "value-of-api-key");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refetches_after_window_expires() {
        let (cache, fetches) = counting_cache();
        let cache = cache.with_refresh_after(Duration::ZERO);
        cache.get("api-key").await.unwrap();
        cache.get("api-key").await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (cache, fetches) = counting_cache();
        cache.get("api-key").await.unwrap();
        cache.invalidate("api-key").await;
        cache.get("api-key").await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_names_cached_independently() {
        let (cache, fetches) = counting_cache();
        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();
        cache.get("a").await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    struct FailingProvider;

    #[async_trait]
    impl SecretProvider for FailingProvider {
        async fn fetch(&self, name: &str) -> Result<String, SecretError> {
            Err(SecretError::NotFound(name.to_string()))
        }
    }

    #[tokio::test]
    async fn provider_failure_is_not_cached() {
        let cache = SecretCache::new(Box::new(FailingProvider));
        assert!(cache.get("missing").await.is_err());
        assert!(cache.get("missing").await.is_err());
    }
}
