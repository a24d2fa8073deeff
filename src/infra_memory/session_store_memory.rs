use crate::domain_port::*;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Process-local stand-in for the Redis session store. Expired entries are
/// dropped lazily on read.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().1 > Instant::now())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionStoreError> {
        let deadline = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.1 > now => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, (_, deadline)| *deadline <= now);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
