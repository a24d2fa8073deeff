use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("store error: {0}")]
    Store(String),
}

/// Key-value cache with per-key expiry. Each call touches a single key.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionStoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), SessionStoreError>;
}
