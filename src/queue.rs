use crate::storage::{Backend, StorageError};

/// Durable FIFO of serialized crawl requests.
///
/// Producers push at the head, consumers pop from the tail, so the oldest
/// entry is always next out even with many workers on one prefix.
#[derive(Clone)]
pub struct WorkQueue {
    backend: Backend,
}

impl WorkQueue {
    pub(crate) fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn add_request(&self, payload: &[u8]) -> Result<(), StorageError> {
        let b = &self.backend;
        let key = b.keys.queue_key();
        b.scope.run(b.client.lpush(&key, &[payload.to_vec()])).await?;
        Ok(())
    }

    /// Enqueue a batch in one round trip; the first payload comes out first.
    pub async fn add_requests(&self, payloads: &[Vec<u8>]) -> Result<u64, StorageError> {
        if payloads.is_empty() {
            return self.queue_size().await;
        }
        let b = &self.backend;
        let key = b.keys.queue_key();
        b.scope.run(b.client.lpush(&key, payloads)).await
    }

    /// Pop the oldest payload, or [`StorageError::QueueEmpty`].
    pub async fn get_request(&self) -> Result<Vec<u8>, StorageError> {
        let b = &self.backend;
        let key = b.keys.queue_key();
        b.scope
            .run(b.client.rpop(&key))
            .await?
            .ok_or(StorageError::QueueEmpty)
    }

    pub async fn queue_size(&self) -> Result<u64, StorageError> {
        let b = &self.backend;
        let key = b.keys.queue_key();
        b.scope.run(b.client.llen(&key)).await
    }
}
