//! Read-through TTL cache over network fetches.
//!
//! `ResponseCache::get_or_fetch` returns a live entry when one exists and
//! otherwise runs the fetch, stores its result and returns it. When the
//! backend cannot be reached at construction time the cache is disabled and
//! every call goes straight to the fetch.

pub mod backend;

pub use backend::{CacheBackend, CacheError, MemoryBackend, RedisBackend};

use analysis_core::{CacheBackendKind, CacheConfig};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct ResponseCache {
    backend: Option<Arc<dyn CacheBackend>>,
    /// One lock per key so concurrent misses for the same key fetch once
    key_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Build the cache described by `config`, degrading to a disabled cache if
    /// the backend is unreachable.
    pub async fn connect(config: &CacheConfig) -> Self {
        match config.backend {
            CacheBackendKind::None => {
                tracing::info!("Response cache disabled by configuration");
                Self::disabled()
            }
            CacheBackendKind::Memory => {
                tracing::info!("Using in-process response cache (ttl {:?})", config.ttl);
                Self::in_memory(config.ttl)
            }
            CacheBackendKind::Redis => {
                let url = config.redis_url();
                let connect = async {
                    let backend = RedisBackend::connect(&url).await?;
                    backend.ping().await?;
                    Ok::<_, CacheError>(backend)
                };

                match tokio::time::timeout(config.connect_timeout, connect).await {
                    Ok(Ok(backend)) => {
                        tracing::info!(
                            "Connected to Redis cache at {}:{} (db {})",
                            config.redis_host,
                            config.redis_port,
                            config.redis_db
                        );
                        Self::with_backend(Arc::new(backend), config.ttl)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "Could not connect to Redis at {}:{}. Caching will be disabled. Error: {}",
                            config.redis_host,
                            config.redis_port,
                            e
                        );
                        Self::disabled()
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Timed out connecting to Redis at {}:{} after {:?}. Caching will be disabled.",
                            config.redis_host,
                            config.redis_port,
                            config.connect_timeout
                        );
                        Self::disabled()
                    }
                }
            }
        }
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            key_locks: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), default_ttl)
    }

    /// Pass-through cache: every call invokes the fetch.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            key_locks: Arc::new(DashMap::new()),
            default_ttl: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("disabled")
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the live entry for `key`, or run `fetch`, store the result for
    /// `ttl` and return it.
    ///
    /// Fetch errors are returned unchanged and never cached. Backend failures
    /// are logged and treated as a miss.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return fetch().await,
        };

        let lock = self
            .key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let result = Self::read_or_fetch(backend.as_ref(), key, ttl, fetch).await;
        drop(guard);

        // Only the map and this call hold the lock: nobody is waiting on the key
        self.key_locks.remove_if(key, |_, held| Arc::strong_count(held) == 2);
        result
    }

    async fn read_or_fetch<T, E, F, Fut>(backend: &dyn CacheBackend, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = Self::read(backend, key).await {
            return Ok(value);
        }

        tracing::info!(key = %key, "Cache MISS, fetching");
        let value = fetch().await?;

        match serde_json::to_string(&value) {
            Ok(body) => {
                if let Err(e) = backend.set_with_expiry(key, &body, ttl).await {
                    tracing::warn!(key = %key, error = %e, "Failed to write cache entry");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to serialize cache entry"),
        }

        Ok(value)
    }

    async fn read<T: DeserializeOwned>(backend: &dyn CacheBackend, key: &str) -> Option<T> {
        match backend.get(key).await {
            Ok(Some(body)) => match serde_json::from_str(&body) {
                Ok(value) => {
                    tracing::info!(key = %key, "Cache HIT");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to fetch");
                None
            }
        }
    }
}
