//! Key-value stores backing the replay guard
//!
//! The replay guard only needs point reads, writes and one atomic
//! conditional write. Two backends:
//! - `MemoryStore`: ordered in-process map, for development and tests
//! - `RedisStore`: Redis, with `SET NX` as the conditional write

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::info;
use wormhole_common::{Error, Result};

/// Minimal persistent key-value contract
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Unconditionally write a value
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Write only if the key is absent, atomically
    ///
    /// Returns `Ok(true)` if the value was written and `Ok(false)` if the key
    /// already existed.
    async fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<bool>;

    /// Remove a key (no-op when absent)
    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Verify the store is reachable
    async fn health_check(&self) -> Result<()>;
}

/// In-process ordered store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub async fn new(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| Error::Store(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        info!("Successfully connected to Redis");

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| Error::Store(e.to_string()))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let mut conn = self.conn.clone();

        // SET NX replies OK when written and nil when the key exists
        let set_result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        Ok(set_result.is_some())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis health check failed: {}", e)))?;
        Ok(())
    }
}
