use std::time::Duration;

use crate::storage::{Backend, StorageError};

/// Sentinel stored at every visited key; presence is what counts.
const VISITED_SENTINEL: &str = "1";

/// Deduplication of request ids with store-enforced retention.
///
/// No in-process lock: each call is one atomic store command.
#[derive(Clone)]
pub struct VisitedSet {
    backend: Backend,
    expiration: Option<Duration>,
}

impl VisitedSet {
    pub(crate) fn new(backend: Backend, expiration: Option<Duration>) -> Self {
        Self { backend, expiration }
    }

    /// Record `id` as visited until the retention elapses.
    pub async fn mark_visited(&self, id: u64) -> Result<(), StorageError> {
        let b = &self.backend;
        let key = b.keys.visited_key(id);
        b.scope
            .run(b.client.set(&key, VISITED_SENTINEL, self.expiration))
            .await
    }

    /// `Ok(false)` on a miss, `Err` only when the read itself failed.
    pub async fn is_visited(&self, id: u64) -> Result<bool, StorageError> {
        let b = &self.backend;
        let key = b.keys.visited_key(id);
        let marker = b.scope.run(b.client.get(&key)).await?;
        Ok(marker.is_some())
    }

    /// How many of `ids` are currently marked, in one round trip.
    pub async fn count_visited(&self, ids: &[u64]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let b = &self.backend;
        let keys: Vec<String> = ids.iter().map(|id| b.keys.visited_key(*id)).collect();
        b.scope.run(b.client.exists(&keys)).await
    }

    /// Restart the retention window of an existing marker.
    ///
    /// Returns whether the marker existed. Without retention there is
    /// nothing to restart, so this only probes.
    pub async fn refresh(&self, id: u64) -> Result<bool, StorageError> {
        let Some(expiration) = self.expiration else {
            return self.is_visited(id).await;
        };
        let b = &self.backend;
        let key = b.keys.visited_key(id);
        b.scope.run(b.client.expire(&key, expiration)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::memory_store::MemoryStore;
    use crate::storage::Storage;
    use crate::store::RemoteStore;
    use std::sync::Arc;
    use std::time::Duration;

    async fn storage(expiration: Duration) -> (Arc<MemoryStore>, Storage) {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::builder()
            .client(store.clone())
            .prefix("test")
            .expiration(expiration)
            .init()
            .await
            .unwrap();
        (store, storage)
    }

    #[tokio::test]
    async fn test_mark_then_probe() {
        let (store, storage) = storage(Duration::ZERO).await;
        let visited = storage.visited();

        assert!(!visited.is_visited(42).await.unwrap());
        visited.mark_visited(42).await.unwrap();
        assert!(visited.is_visited(42).await.unwrap());
        assert!(!visited.is_visited(43).await.unwrap());

        assert_eq!(
            store.get("test:request:42").await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_elapses() {
        let (_store, storage) = storage(Duration::from_secs(1)).await;
        let visited = storage.visited();

        visited.mark_visited(42).await.unwrap();
        assert!(visited.is_visited(42).await.unwrap());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!visited.is_visited(42).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retention_keeps_marker() {
        let (_store, storage) = storage(Duration::ZERO).await;
        storage.visited().mark_visited(7).await.unwrap();
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(storage.visited().is_visited(7).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_retention_is_accepted() {
        let (_store, storage) = storage(Duration::from_secs(u64::MAX)).await;
        let visited = storage.visited();
        visited.mark_visited(1).await.unwrap();
        assert!(visited.refresh(1).await.unwrap());
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(visited.is_visited(1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_extends_retention() {
        let (_store, storage) = storage(Duration::from_secs(10)).await;
        let visited = storage.visited();

        visited.mark_visited(1).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(visited.refresh(1).await.unwrap());
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(visited.is_visited(1).await.unwrap());

        assert!(!visited.refresh(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_visited() {
        let (_store, storage) = storage(Duration::ZERO).await;
        let visited = storage.visited();
        visited.mark_visited(1).await.unwrap();
        visited.mark_visited(3).await.unwrap();

        assert_eq!(visited.count_visited(&[1, 2, 3, 4]).await.unwrap(), 2);
        assert_eq!(visited.count_visited(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_an_error() {
        let (store, storage) = storage(Duration::ZERO).await;
        store.set_offline(true);
        assert!(storage.visited().is_visited(1).await.is_err());
        assert!(storage.visited().mark_visited(1).await.is_err());
    }
}
