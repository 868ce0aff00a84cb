use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::error::Error;
use crate::store::KeyValueStore;
use crate::CacheConfig;

pub(crate) const LOG_TARGET: &str = "irminsul::cache::redis";

/// Lifecycle state of the underlying connection.
///
/// Mutated only by the connect/reconnect routines and by command-failure
/// observation; readers get a possibly-stale snapshot, which is fine since
/// every command re-checks readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Ready = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => ConnectionState::Ready,
            1 => ConnectionState::Connecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Redis-backed store for the render cache.
///
/// Cloning is cheap and shares the one underlying connection; the handler
/// keeps a single instance per process.
#[derive(Debug, Clone)]
pub struct RedisStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    client: Client,
    config: CacheConfig,
    connection: RwLock<Option<MultiplexedConnection>>,
    state: AtomicU8,
    /// Single-flight guard for the reconnection sequence. Best-effort: two
    /// failures racing past the check may both spawn, at worst a redundant
    /// connect.
    reconnecting: AtomicBool,
    /// Set once the attempt ceiling is hit; the store then reports
    /// unavailability instead of retrying forever.
    exhausted: AtomicBool,
}

impl RedisStore {
    /// Create the store and attempt an initial connection.
    ///
    /// Errors only on an unusable URL. A reachable-but-down server leaves
    /// the store in a degraded state with a reconnection sequence running;
    /// operations report unavailability until it succeeds.
    pub async fn connect(config: CacheConfig) -> Result<Self, Error> {
        let client = Client::open(config.url.as_str())?;
        let store = Self {
            inner: Arc::new(Inner {
                client,
                config,
                connection: RwLock::new(None),
                state: AtomicU8::new(ConnectionState::Disconnected as u8),
                reconnecting: AtomicBool::new(false),
                exhausted: AtomicBool::new(false),
            }),
        };

        if let Err(e) = store.establish().await {
            warn!(target: LOG_TARGET, error = %e, "Initial connection failed, continuing degraded.");
            store.spawn_reconnect();
        }
        Ok(store)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }

    /// Open a connection, PING it, and install it.
    async fn establish(&self) -> Result<(), Error> {
        self.set_state(ConnectionState::Connecting);

        let connect = self.inner.client.get_multiplexed_async_connection();
        let mut conn = match timeout(self.inner.config.connect_timeout, connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(Error::Timeout);
            }
        };

        let ping: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        if let Err(e) = ping {
            self.set_state(ConnectionState::Disconnected);
            return Err(e.into());
        }

        *self.inner.connection.write().await = Some(conn);
        self.set_state(ConnectionState::Ready);
        Ok(())
    }

    /// Snapshot of the live connection, if ready. When not ready this kicks
    /// off recovery in the background and the current call reports
    /// unavailability instead of waiting on it.
    async fn ready_connection(&self) -> Option<MultiplexedConnection> {
        if self.state() == ConnectionState::Ready {
            if let Some(conn) = self.inner.connection.read().await.clone() {
                return Some(conn);
            }
        }
        self.spawn_reconnect();
        None
    }

    fn spawn_reconnect(&self) {
        if self.inner.exhausted.load(Ordering::Relaxed) {
            return;
        }
        if self
            .inner
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let store = self.clone();
        tokio::spawn(async move { store.run_reconnect().await });
    }

    /// The bounded reconnection sequence: tear down whatever is left of the
    /// old connection, wait attempt × base delay (capped), reinitialize.
    async fn run_reconnect(self) {
        let max_attempts = self.inner.config.max_reconnect_attempts;
        for attempt in 1..=max_attempts {
            // Shutdown may race a sequence already in flight; don't reopen a
            // connection that was just released.
            if self.inner.exhausted.load(Ordering::SeqCst) {
                self.inner.reconnecting.store(false, Ordering::SeqCst);
                return;
            }
            self.inner.connection.write().await.take();
            self.set_state(ConnectionState::Connecting);

            let delay = std::cmp::min(
                self.inner.config.reconnect_base_delay * attempt,
                self.inner.config.max_retry_delay,
            );
            sleep(delay).await;

            match self.establish().await {
                Ok(()) => {
                    info!(target: LOG_TARGET, attempt, "Reconnected to store.");
                    self.inner.reconnecting.store(false, Ordering::SeqCst);
                    return;
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, attempt, error = %e, "Reconnect attempt failed.");
                }
            }
        }

        error!(
            target: LOG_TARGET,
            attempts = max_attempts,
            "Giving up on reconnection, cache now reports unavailable."
        );
        self.set_state(ConnectionState::Disconnected);
        self.inner.exhausted.store(true, Ordering::SeqCst);
        self.inner.reconnecting.store(false, Ordering::SeqCst);
    }

    /// Note a command failure. Recoverable failures (dropped/broken
    /// connection, timeout) demote the state and trigger the reconnection
    /// sequence if one is not already in flight.
    fn observe_failure(&self, error: &Error) {
        if error.is_recoverable() {
            self.set_state(ConnectionState::Disconnected);
            self.spawn_reconnect();
        }
    }

    /// Run one command with the configured timeout, re-issuing it up to
    /// `max_command_retries` times when a recoverable failure strikes and
    /// the connection has already come back. Never sleeps: if readiness is
    /// gone, the call fails fast and the caller degrades to a miss.
    async fn run_command<T, Fut>(
        &self,
        f: impl Fn(MultiplexedConnection) -> Fut,
    ) -> Result<T, Error>
    where
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let mut last = Error::Connection("store not ready".to_string());
        for _ in 0..=self.inner.config.max_command_retries {
            let Some(conn) = self.ready_connection().await else {
                return Err(last);
            };
            match timeout(self.inner.config.command_timeout, f(conn)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    let e: Error = e.into();
                    let recoverable = e.is_recoverable();
                    self.observe_failure(&e);
                    if !recoverable {
                        return Err(e);
                    }
                    last = e;
                }
                Err(_) => {
                    let e = Error::Timeout;
                    self.observe_failure(&e);
                    last = e;
                }
            }
        }
        Err(last)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.run_command(|mut conn| async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error> {
        self.run_command(|mut conn| async move {
            match ttl_seconds {
                Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await,
                None => conn.set::<_, _, ()>(key, value).await,
            }
        })
        .await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), Error> {
        self.run_command(|mut conn| async move { conn.sadd::<_, _, ()>(key, member).await })
            .await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        self.run_command(|mut conn| async move { conn.smembers::<_, Vec<String>>(key).await })
            .await
    }

    async fn del(&self, keys: &[String]) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }
        self.run_command(|mut conn| async move { conn.del::<_, ()>(keys.to_vec()).await })
            .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, Error> {
        self.run_command(|mut conn| async move {
            let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
            Ok(keys)
        })
        .await
    }

    async fn quit(&self) -> Result<(), Error> {
        // No reconnects past shutdown.
        self.inner.exhausted.store(true, Ordering::SeqCst);
        let conn = self.inner.connection.write().await.take();
        self.set_state(ConnectionState::Disconnected);

        let Some(mut conn) = conn else {
            return Ok(());
        };
        let quit = async move {
            let _: () = redis::cmd("QUIT").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(())
        };
        match timeout(self.inner.config.command_timeout, quit).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests against a live server are ignored by default.
    // Run with: cargo test -- --ignored

    #[tokio::test]
    #[ignore = "requires running Redis instance"]
    async fn get_set_del_round_trip() {
        let store = RedisStore::connect(CacheConfig::default()).await.unwrap();
        assert_eq!(store.state(), ConnectionState::Ready);

        store.set("irminsul:test:key", "value", None).await.unwrap();
        let value = store.get("irminsul:test:key").await.unwrap();
        assert_eq!(value.as_deref(), Some("value"));

        store.del(&["irminsul:test:key".to_string()]).await.unwrap();
        assert_eq!(store.get("irminsul:test:key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_server_degrades_instead_of_blocking() {
        let config = CacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: std::time::Duration::from_millis(100),
            max_reconnect_attempts: 1,
            reconnect_base_delay: std::time::Duration::from_millis(10),
            ..Default::default()
        };
        let store = RedisStore::connect(config).await.unwrap();

        // Commands fail fast with a connection error rather than hanging.
        let result = store.get("any").await;
        assert!(result.is_err());
        assert_ne!(store.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn quit_pins_the_store_unavailable() {
        let config = CacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: std::time::Duration::from_millis(100),
            max_reconnect_attempts: 1,
            reconnect_base_delay: std::time::Duration::from_millis(10),
            ..Default::default()
        };
        let store = RedisStore::connect(config).await.unwrap();

        // Releasing a never-established connection is still a clean release.
        store.quit().await.unwrap();

        // No reconnection sequence runs past shutdown.
        assert!(store.get("any").await.is_err());
        assert_ne!(store.state(), ConnectionState::Ready);
    }
}
