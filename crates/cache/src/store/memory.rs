use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::Error;
use crate::store::KeyValueStore;

/// One slot in the shared keyspace: either a plain value or a tag set,
/// matching how the two live side by side in Redis.
#[derive(Debug)]
enum Slot {
    Value {
        data: String,
        expires_at: Option<Instant>,
    },
    Set(HashSet<String>),
}

/// In-memory store implementation using DashMap for thread-safety.
///
/// Implements the same protocol as the Redis store, with TTL enforced on
/// read. Used in tests and as an embeddable fallback tier.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, Slot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys (sets included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        if let Some(slot) = self.entries.get(key) {
            match &*slot {
                Slot::Value { data, expires_at } => {
                    if expires_at.map_or(true, |at| at > Instant::now()) {
                        return Ok(Some(data.clone()));
                    }
                    // Entry expired, remove it.
                    drop(slot);
                    self.entries.remove(key);
                }
                Slot::Set(_) => {}
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error> {
        self.entries.insert(
            key.to_string(),
            Slot::Value {
                data: value.to_string(),
                expires_at: ttl_seconds.map(|s| Instant::now() + Duration::from_secs(s)),
            },
        );
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), Error> {
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Slot::Set(HashSet::new()));
        if let Slot::Set(members) = &mut *slot {
            members.insert(member.to_string());
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        Ok(match self.entries.get(key).as_deref() {
            Some(Slot::Set(members)) => members.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn del(&self, keys: &[String]) -> Result<(), Error> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn quit(&self) -> Result<(), Error> {
        Ok(())
    }
}
