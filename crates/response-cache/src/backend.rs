use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            CacheError::Connection(e.to_string())
        } else {
            CacheError::Command(e.to_string())
        }
    }
}

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` for absent or expired keys.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Redis-backed store. Expiry is delegated to Redis via `SET ... EX`.
#[derive(Clone)]
pub struct RedisBackend {
    conn: redis::aio::ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis rejects EX 0
        let secs = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(secs)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let reply = redis::cmd("PING").query_async::<String>(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Command(format!("unexpected PING reply: {}", reply)))
        }
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store; expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_get_set() {
        let backend = MemoryBackend::new();
        assert!(backend.get("k").await.unwrap().is_none());

        backend.set_with_expiry("k", "v1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v1"));

        backend.set_with_expiry("k", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v2"));
        assert!(backend.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend_lazy_expiry() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("k", "v", Duration::from_millis(30)).await.unwrap();
        assert_eq!(backend.len(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;

        // Still stored until someone reads it
        assert_eq!(backend.len(), 1);
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.is_empty());
    }
}
