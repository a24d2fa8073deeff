use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Redis rejects `SET .. EX 0`; round sub-second TTLs up to one second.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionStoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, value, Self::ttl_secs(ttl))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(val)
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }
}
