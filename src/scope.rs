//! Shared cancellation and deadline applied to every remote call.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::storage::StorageError;
use crate::store::StoreError;

/// Cancellation scope handed to every component by the controller.
///
/// A scope may carry a shutdown receiver (the same `watch::channel(false)`
/// the crawler uses for Ctrl+C) and an absolute deadline. Clones share both.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelScope {
    /// Never cancelled, no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Cancel when `true` is sent on the channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now. The clock starts here, not per call.
    /// A timeout past the clock's range means no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Drive one store call; the call is dropped if the scope ends first.
    pub async fn run<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.guard(async { call.await.map_err(StorageError::from) })
            .await
    }

    /// Like `run`, for futures that already speak `StorageError`.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StorageError::DeadlineExceeded);
            }
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| StorageError::DeadlineExceeded)?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled(self.shutdown.clone()) => Err(StorageError::Cancelled),
            result = bounded => result,
        }
    }
}

/// Resolves once the shutdown flag flips to true; never if there is no
/// receiver or the sender goes away.
async fn cancelled(shutdown: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
