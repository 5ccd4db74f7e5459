//! Storage controller: configuration, startup probe and bulk reset.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::cookies::CookieStore;
use crate::keys::KeySpace;
use crate::queue::WorkQueue;
use crate::scope::CancelScope;
use crate::store::{RemoteStore, StoreError};
use crate::visited::VisitedSet;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("redis client not found")]
    MissingClient,

    #[error("redis connection error: {0}")]
    Connection(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("queue is empty")]
    QueueEmpty,

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StorageError {
    /// True for the empty-queue signal, the only "miss" surfaced as an error.
    pub fn is_queue_empty(&self) -> bool {
        matches!(self, StorageError::QueueEmpty)
    }

    /// True when the scope ended the call rather than the store.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StorageError::Cancelled | StorageError::DeadlineExceeded)
    }
}

/// What every component needs for a round trip: client, key layout, scope.
#[derive(Clone)]
pub(crate) struct Backend {
    pub(crate) client: Arc<dyn RemoteStore>,
    pub(crate) keys: KeySpace,
    pub(crate) scope: CancelScope,
}

/// Configures and initializes a [`Storage`].
#[derive(Default)]
pub struct StorageBuilder {
    client: Option<Arc<dyn RemoteStore>>,
    prefix: String,
    expiration: Option<Duration>,
    scope: Option<CancelScope>,
}

impl StorageBuilder {
    pub fn client(mut self, client: Arc<dyn RemoteStore>) -> Self {
        self.client = Some(client);
        self
    }

    /// Key namespace. Empty falls back to [`Config::DEFAULT_PREFIX`].
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Retention of visited markers. Zero keeps them forever.
    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = (!expiration.is_zero()).then_some(expiration);
        self
    }

    pub fn scope(mut self, scope: CancelScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Apply defaults, then probe the store.
    ///
    /// Fails with [`StorageError::MissingClient`] before any I/O when no
    /// client was supplied, and with [`StorageError::Connection`] when the
    /// probe fails.
    #[tracing::instrument(skip(self), fields(prefix = %self.prefix))]
    pub async fn init(self) -> Result<Storage, StorageError> {
        let prefix = if self.prefix.is_empty() {
            Config::DEFAULT_PREFIX.to_string()
        } else {
            self.prefix
        };
        let scope = self.scope.unwrap_or_else(CancelScope::background);
        let client = self.client.ok_or(StorageError::MissingClient)?;

        let probe = client.ping();
        scope
            .guard(async { probe.await.map_err(StorageError::Connection) })
            .await?;

        info!(prefix = %prefix, expiration = ?self.expiration, "Crawl storage initialized");

        let backend = Backend {
            client,
            keys: KeySpace::new(prefix),
            scope,
        };
        Ok(Storage {
            visited: VisitedSet::new(backend.clone(), self.expiration),
            cookies: CookieStore::new(backend.clone()),
            queue: WorkQueue::new(backend.clone()),
            backend,
            expiration: self.expiration,
        })
    }
}

/// Key counts under one prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub prefix: String,
    pub queue_len: u64,
    pub cookie_records: u64,
    pub visited_markers: u64,
}

/// Initialized crawl storage. Cheap to clone; clones share the cookie lock.
#[derive(Clone)]
pub struct Storage {
    backend: Backend,
    expiration: Option<Duration>,
    visited: VisitedSet,
    cookies: CookieStore,
    queue: WorkQueue,
}

impl Storage {
    pub fn builder() -> StorageBuilder {
        StorageBuilder::default()
    }

    pub fn prefix(&self) -> &str {
        self.backend.keys.prefix()
    }

    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    pub fn keys(&self) -> &KeySpace {
        &self.backend.keys
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Delete every visited marker, cookie record and the queue of this prefix.
    ///
    /// Holds the cookie write lock so an in-flight cookie write is never
    /// enumerated away half-done. Visited and queue writes racing the clear
    /// may survive or vanish.
    #[tracing::instrument(skip(self), fields(prefix = %self.prefix()))]
    pub async fn clear(&self) -> Result<u64, StorageError> {
        let b = &self.backend;
        let lock = self.cookies.lock();
        let _guard = b.scope.guard(async { Ok::<_, StorageError>(lock.write().await) }).await?;

        let mut keys = b.scope.run(b.client.keys(&b.keys.cookie_pattern())).await?;
        let visited = b.scope.run(b.client.keys(&b.keys.visited_pattern())).await?;
        debug!(cookies = keys.len(), visited = visited.len(), "Enumerated keys to clear");
        keys.extend(visited);
        keys.push(b.keys.queue_key());

        let removed = b.scope.run(b.client.del(&keys)).await?;
        info!(removed, "Cleared crawl state");
        Ok(removed)
    }

    /// Count what this prefix currently holds.
    pub async fn stats(&self) -> Result<StorageStats, StorageError> {
        let b = &self.backend;
        let queue_len = self.queue.queue_size().await?;
        let cookie_records = b.scope.run(b.client.keys(&b.keys.cookie_pattern())).await?;
        let visited_markers = b.scope.run(b.client.keys(&b.keys.visited_pattern())).await?;
        Ok(StorageStats {
            prefix: self.prefix().to_string(),
            queue_len,
            cookie_records: cookie_records.len() as u64,
            visited_markers: visited_markers.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use url::Url;

    #[tokio::test]
    async fn test_init_without_client() {
        let result = Storage::builder().prefix("test").init().await;
        assert!(matches!(result, Err(StorageError::MissingClient)));
    }

    #[tokio::test]
    async fn test_missing_client_wins_over_cancelled_scope() {
        let (_tx, rx) = tokio::sync::watch::channel(true);
        let result = Storage::builder()
            .scope(CancelScope::background().with_shutdown(rx))
            .init()
            .await;
        assert!(matches!(result, Err(StorageError::MissingClient)));
    }

    #[tokio::test]
    async fn test_init_unreachable() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let err = Storage::builder()
            .client(store)
            .init()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::Connection(StoreError::Unavailable(_))));
        assert!(err.to_string().starts_with("redis connection error"));
    }

    #[tokio::test]
    async fn test_defaults() {
        let storage = Storage::builder()
            .client(Arc::new(MemoryStore::new()))
            .expiration(Duration::ZERO)
            .init()
            .await
            .unwrap();
        assert_eq!(storage.prefix(), "colly");
        assert_eq!(storage.expiration(), None);
        assert_eq!(storage.keys().queue_key(), "colly:queue");
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::builder()
            .client(store.clone())
            .prefix("test")
            .init()
            .await
            .unwrap();
        let url = Url::parse("https://example.com/").unwrap();

        storage.visited().mark_visited(1).await.unwrap();
        storage.visited().mark_visited(2).await.unwrap();
        storage.cookies().set_cookies(&url, "a=1").await;
        storage.queue().add_request(b"r1").await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(
            stats,
            StorageStats {
                prefix: "test".to_string(),
                queue_len: 1,
                cookie_records: 1,
                visited_markers: 2,
            }
        );

        assert_eq!(storage.clear().await.unwrap(), 4);
        assert!(store.is_empty());
        // Clearing again only finds nothing.
        assert_eq!(storage.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_surfaces_store_failure() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::builder()
            .client(store.clone())
            .init()
            .await
            .unwrap();
        store.set_offline(true);
        assert!(matches!(
            storage.clear().await,
            Err(StorageError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_waits_for_cookie_writers() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::builder()
            .client(store.clone())
            .init()
            .await
            .unwrap();
        storage.visited().mark_visited(1).await.unwrap();
        let guard = storage.cookies().lock().clone().write_owned().await;

        let clearing = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.clear().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!clearing.is_finished());
        assert!(!store.is_empty());

        drop(guard);
        assert_eq!(clearing.await.unwrap().unwrap(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_excludes_readers() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::builder()
            .client(store)
            .init()
            .await
            .unwrap();
        let guard = storage.cookies().lock().clone().read_owned().await;
        let pending = tokio::time::timeout(Duration::from_millis(50), storage.clear()).await;
        assert!(pending.is_err());
        drop(guard);
        assert_eq!(storage.clear().await.unwrap(), 0);
    }
}
