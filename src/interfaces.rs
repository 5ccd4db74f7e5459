//! Traits the crawler programs against, so it can swap storage backends.

use async_trait::async_trait;
use url::Url;

use crate::storage::{Storage, StorageError};

/// Dedup and session persistence used while scheduling and fetching.
///
/// Cookie methods have no error channel: implementations log failures and
/// fall back to "no cookies".
#[async_trait]
pub trait VisitedStorage: Send + Sync {
    async fn visited(&self, request_id: u64) -> Result<(), StorageError>;

    async fn is_visited(&self, request_id: u64) -> Result<bool, StorageError>;

    async fn cookies(&self, url: &Url) -> String;

    async fn set_cookies(&self, url: &Url, cookies: &str);
}

/// Pending-request persistence for resumable crawls.
#[async_trait]
pub trait QueueStorage: Send + Sync {
    async fn add_request(&self, request: &[u8]) -> Result<(), StorageError>;

    /// Returns [`StorageError::QueueEmpty`] when nothing is pending.
    async fn get_request(&self) -> Result<Vec<u8>, StorageError>;

    async fn queue_size(&self) -> Result<u64, StorageError>;
}

#[async_trait]
impl VisitedStorage for Storage {
    async fn visited(&self, request_id: u64) -> Result<(), StorageError> {
        Storage::visited(self).mark_visited(request_id).await
    }

    async fn is_visited(&self, request_id: u64) -> Result<bool, StorageError> {
        Storage::visited(self).is_visited(request_id).await
    }

    async fn cookies(&self, url: &Url) -> String {
        Storage::cookies(self).cookies(url).await
    }

    async fn set_cookies(&self, url: &Url, cookies: &str) {
        Storage::cookies(self).set_cookies(url, cookies).await
    }
}

#[async_trait]
impl QueueStorage for Storage {
    async fn add_request(&self, request: &[u8]) -> Result<(), StorageError> {
        self.queue().add_request(request).await
    }

    async fn get_request(&self) -> Result<Vec<u8>, StorageError> {
        self.queue().get_request().await
    }

    async fn queue_size(&self) -> Result<u64, StorageError> {
        self.queue().queue_size().await
    }
}
