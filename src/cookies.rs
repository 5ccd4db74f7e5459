use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use url::Url;

use crate::storage::{Backend, StorageError};

/// Host part of a cookie key: the URL host plus an explicit port, if any.
pub fn origin_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Per-origin cookie blobs, stored without expiry.
///
/// One process-wide read-write lock covers every origin: reads share it,
/// writes and [`Storage::clear`](crate::storage::Storage::clear) take it
/// exclusively. Callers doing read-merge-write on one origin rely on it.
#[derive(Clone)]
pub struct CookieStore {
    backend: Backend,
    lock: Arc<RwLock<()>>,
}

impl CookieStore {
    pub(crate) fn new(backend: Backend) -> Self {
        Self {
            backend,
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub(crate) fn lock(&self) -> &Arc<RwLock<()>> {
        &self.lock
    }

    fn key_for(&self, url: &Url) -> Result<String, StorageError> {
        let host = origin_host(url).ok_or_else(|| StorageError::MissingHost(url.to_string()))?;
        Ok(self.backend.keys.cookie_key(&host))
    }

    /// Store the cookie blob for the URL's origin, last write wins.
    pub async fn try_set_cookies(&self, url: &Url, cookies: &str) -> Result<(), StorageError> {
        let key = self.key_for(url)?;
        let b = &self.backend;
        b.scope
            .guard(async {
                let _guard = self.lock.write().await;
                b.client.set(&key, cookies, None).await.map_err(StorageError::from)
            })
            .await
    }

    /// Cookie blob for the URL's origin, empty when none was stored.
    pub async fn try_cookies(&self, url: &Url) -> Result<String, StorageError> {
        let key = self.key_for(url)?;
        let b = &self.backend;
        b.scope
            .guard(async {
                let _guard = self.lock.read().await;
                let cookies = b.client.get(&key).await?;
                Ok::<_, StorageError>(cookies.unwrap_or_default())
            })
            .await
    }

    /// Like [`try_set_cookies`](Self::try_set_cookies) for callers without an
    /// error channel: failures are logged and dropped.
    pub async fn set_cookies(&self, url: &Url, cookies: &str) {
        if let Err(e) = self.try_set_cookies(url, cookies).await {
            warn!(url = %url, error = %e, "SetCookies failed");
        }
    }

    /// Like [`try_cookies`](Self::try_cookies) but degrades to an empty blob
    /// on failure.
    pub async fn cookies(&self, url: &Url) -> String {
        match self.try_cookies(url).await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(url = %url, error = %e, "Cookies lookup failed");
                String::new()
            }
        }
    }
}
