pub mod cli;
pub mod config;
pub mod cookies;
pub mod interfaces;
pub mod keys;
pub mod logging;
pub mod memory_store;
pub mod queue;
pub mod redis_store;
pub mod scope;
pub mod storage;
pub mod store;
pub mod visited;

// Re-export main types for library usage
pub use cookies::{origin_host, CookieStore};
pub use interfaces::{QueueStorage, VisitedStorage};
pub use keys::KeySpace;
pub use memory_store::MemoryStore;
pub use queue::WorkQueue;
pub use redis_store::RedisStore;
pub use scope::CancelScope;
pub use storage::{Storage, StorageBuilder, StorageError, StorageStats};
pub use store::{RemoteStore, StoreError};
pub use visited::VisitedSet;
