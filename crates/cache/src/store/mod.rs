use async_trait::async_trait;

use crate::error::Error;

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::{ConnectionState, RedisStore};

/// The key-value store protocol the render cache is built on.
///
/// This is the small slice of the Redis command set the handler needs: plain
/// string values for cache entries, sets for tag indexes, and a pattern scan
/// for namespace-wide flushes.
///
/// Implementors must be thread-safe (Send + Sync) and debuggable.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// A name for metrics/tracing.
    fn name(&self) -> &'static str;

    /// Fetch the string value at `key`. `None` for a missing key.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write the string value at `key`, with an optional TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error>;

    /// Add `member` to the set at `key`.
    async fn sadd(&self, key: &str, member: &str) -> Result<(), Error>;

    /// All members of the set at `key`. Empty for a missing key.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error>;

    /// Delete the given keys in one batch.
    async fn del(&self, keys: &[String]) -> Result<(), Error>;

    /// All keys matching `pattern` (trailing-`*` prefix patterns only).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, Error>;

    /// Release the underlying connection. Best-effort; called once at
    /// process shutdown.
    async fn quit(&self) -> Result<(), Error>;
}
