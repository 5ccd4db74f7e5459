//! The command subset crawl state needs from a remote key-value store.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Wrong type for key {0}")]
    WrongType(String),
}

/// Capability interface over a key-value store.
///
/// Every method is a single round trip and is atomic at the store. Misses are
/// returned as `None`/`0`, never as errors.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Enumerate keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a string value. `None` keeps the key forever.
    async fn set(
        &self,
        key: &str,
        value: &str,
        expiration: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Count how many of the given keys exist.
    async fn exists(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Set a TTL on an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, expiration: Duration) -> Result<bool, StoreError>;

    /// Insert values at the head of a list, returning the new length.
    async fn lpush(&self, key: &str, values: &[Vec<u8>]) -> Result<u64, StoreError>;

    /// Remove and return the tail of a list.
    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn llen(&self, key: &str) -> Result<u64, StoreError>;
}
