//! Distributed render cache for the wiki's incremental rendering pipeline.
//!
//! A single handler instance per process fronts a remote key-value store.
//! Page bodies and data payloads are written through with optional
//! revalidation windows and tag indexes; tag invalidation drops every entry
//! indexed under a tag in one pass. The store connection is created once,
//! monitored, and re-established with a bounded backoff when it breaks.
//! When it cannot be, the cache degrades to always-miss instead of
//! surfacing errors to the render path.

use std::time::Duration;

mod entry;
mod error;
mod handler;
pub mod store;

pub use entry::{CacheContext, CacheEntry, CacheValue, CachedValue};
pub use error::Error;
pub use handler::RenderCache;
pub use store::{ConnectionState, InMemoryStore, KeyValueStore, RedisStore};

/// Configuration for the render cache and its store connection.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store connection URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
    /// Namespace prefix prepended to every key this handler touches.
    pub key_prefix: String,
    /// Per-command deadline.
    pub command_timeout: Duration,
    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
    /// How many times a command is re-issued after a recoverable failure.
    pub max_command_retries: u32,
    /// Attempt ceiling for the reconnection sequence.
    pub max_reconnect_attempts: u32,
    /// Delay before reconnect attempt n is `n × reconnect_base_delay`,
    /// capped at `max_retry_delay`.
    pub reconnect_base_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "irminsul:render:".to_string(),
            command_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
            max_command_retries: 1,
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(5),
        }
    }
}
