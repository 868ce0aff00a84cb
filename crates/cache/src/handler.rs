use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::entry::{CacheContext, CacheEntry, CacheValue};
use crate::store::{InMemoryStore, KeyValueStore, RedisStore};
use crate::CacheConfig;

pub(crate) const LOG_TARGET: &str = "irminsul::cache::handler";

static SHARED: OnceCell<Arc<RenderCache>> = OnceCell::const_new();

/// The render-cache handler the serving layer talks to.
///
/// Every operation is a safe default under failure: reads degrade to misses,
/// writes and invalidations to no-ops. Store-level errors are logged here and
/// never cross into the render pipeline, so a cache outage costs latency,
/// not correctness.
#[derive(Debug)]
pub struct RenderCache {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
}

impl RenderCache {
    /// Build a handler over an explicit store. This is the injectable
    /// constructor; production code normally goes through [`Self::shared`].
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self { store, key_prefix: key_prefix.into() }
    }

    /// The process-wide handler: constructed on first call, reused ever
    /// after. The store connection is expensive, so later calls get the same
    /// instance regardless of the config they pass.
    ///
    /// An unusable store URL falls back to an in-process store rather than
    /// failing construction.
    pub async fn shared(config: CacheConfig) -> Arc<RenderCache> {
        SHARED
            .get_or_init(|| async move {
                let key_prefix = config.key_prefix.clone();
                let store: Arc<dyn KeyValueStore> = match RedisStore::connect(config).await {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        error!(
                            target: LOG_TARGET,
                            error = %e,
                            "Store unusable, falling back to in-process cache."
                        );
                        Arc::new(InMemoryStore::new())
                    }
                };
                Arc::new(RenderCache::new(store, key_prefix))
            })
            .await
            .clone()
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}tags:{}", self.key_prefix, tag)
    }

    /// Look up a cached entry. Any failure (store unreachable, timeout,
    /// unparseable payload) is a miss.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let full_key = self.entry_key(key);
        let raw = match self.store.get(&full_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: LOG_TARGET, key = %key, error = %e, "Cache read failed, treating as miss.");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(target: LOG_TARGET, key = %key, error = %e, "Stored entry unparseable, treating as miss.");
                None
            }
        }
    }

    /// Write a computed page body or data payload. Streamed bodies are fully
    /// buffered first; the entry is stamped with the current time and indexed
    /// under each tag in `ctx`. Failures are logged and swallowed.
    pub async fn set(&self, key: &str, value: CacheValue, ctx: &CacheContext) {
        let full_key = self.entry_key(key);

        let stored = match value.into_stored().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(target: LOG_TARGET, key = %key, error = %e, "Dropping cache write, body buffering failed.");
                return;
            }
        };

        let entry = CacheEntry {
            value: stored,
            last_modified: Utc::now().timestamp_millis(),
            tags: ctx.tags.clone(),
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(target: LOG_TARGET, key = %key, error = %e, "Dropping cache write, entry not serializable.");
                return;
            }
        };

        if let Err(e) = self.store.set(&full_key, &json, ctx.revalidate).await {
            warn!(target: LOG_TARGET, key = %key, error = %e, "Cache write failed.");
            return;
        }

        for tag in &ctx.tags {
            if let Err(e) = self.store.sadd(&self.tag_key(tag), &full_key).await {
                warn!(target: LOG_TARGET, key = %key, tag = %tag, error = %e, "Tag indexing failed.");
            }
        }
    }

    /// Invalidate every entry indexed under the given tag(s), then drop the
    /// tag index itself. A tag with no indexed keys is a no-op.
    pub async fn revalidate_tag<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref();
            let tag_key = self.tag_key(tag);

            let members = match self.store.smembers(&tag_key).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(target: LOG_TARGET, tag = %tag, error = %e, "Tag lookup failed, skipping invalidation.");
                    continue;
                }
            };

            if !members.is_empty() {
                if let Err(e) = self.store.del(&members).await {
                    // Leave the index in place so a later pass can retry.
                    warn!(target: LOG_TARGET, tag = %tag, error = %e, "Tagged entry deletion failed.");
                    continue;
                }
            }

            if let Err(e) = self.store.del(std::slice::from_ref(&tag_key)).await {
                warn!(target: LOG_TARGET, tag = %tag, error = %e, "Tag index deletion failed.");
            }
        }
    }

    /// Flush everything under this handler's key namespace, tag indexes
    /// included.
    pub async fn clear(&self) {
        let pattern = format!("{}*", self.key_prefix);
        let keys = match self.store.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(target: LOG_TARGET, error = %e, "Namespace scan failed, skipping flush.");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.store.del(&keys).await {
            warn!(target: LOG_TARGET, error = %e, "Namespace flush failed.");
        }
    }

    /// Hook for request-scoped memoization resets. This handler has no
    /// request-local tier, so there is nothing to reset.
    pub fn reset_request_cache(&self) {}

    /// Release the store connection. Best-effort: failures are logged, never
    /// raised, even from a degraded state.
    pub async fn shutdown(&self) {
        if let Err(e) = self.store.quit().await {
            warn!(target: LOG_TARGET, error = %e, "Connection release failed during shutdown.");
        }
    }

    /// Await a termination signal, then release the connection. Spawn this
    /// once at process start.
    pub async fn shutdown_on_signal(&self) {
        wait_for_termination().await;
        info!(target: LOG_TARGET, "Termination signal received, releasing cache connection.");
        self.shutdown().await;
    }
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(target: LOG_TARGET, error = %e, "SIGTERM handler unavailable, waiting on ctrl-c only.");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CachedValue;
    use crate::error::Error;
    use async_trait::async_trait;

    fn handler() -> RenderCache {
        RenderCache::new(Arc::new(InMemoryStore::new()), "irminsul:render:")
    }

    #[tokio::test]
    async fn get_returns_what_set_stored() {
        let cache = handler();
        let ctx = CacheContext::default();

        cache
            .set("page:/hsr/characters", serde_json::json!({"html": "ok"}).into(), &ctx)
            .await;

        let entry = cache.get("page:/hsr/characters").await.unwrap();
        assert_eq!(entry.value, CachedValue::Json(serde_json::json!({"html": "ok"})));
        assert!(entry.last_modified > 0);
        assert!(entry.tags.is_empty());
    }

    #[tokio::test]
    async fn keys_are_namespaced() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RenderCache::new(store.clone(), "irminsul:render:");

        cache.set("page", b"body".to_vec().into(), &CacheContext::default()).await;

        assert!(store.get("irminsul:render:page").await.unwrap().is_some());
        assert!(store.get("page").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_invalidation_removes_entries_and_index() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RenderCache::new(store.clone(), "irminsul:render:");
        let ctx = CacheContext { tags: vec!["characters".to_string()], revalidate: None };

        cache.set("k1", b"one".to_vec().into(), &ctx).await;
        cache.set("k2", b"two".to_vec().into(), &ctx).await;
        assert!(cache.get("k1").await.is_some());
        assert!(cache.get("k2").await.is_some());

        cache.revalidate_tag(["characters"]).await;

        assert!(cache.get("k1").await.is_none());
        assert!(cache.get("k2").await.is_none());
        // The index set itself is gone too.
        assert!(store
            .smembers("irminsul:render:tags:characters")
            .await
            .unwrap()
            .is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn streamed_bodies_are_buffered_before_storage() {
        use bytes::Bytes;
        use futures::StreamExt;

        let cache = handler();
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"<html>")),
            Ok(Bytes::from_static(b"page")),
            Ok(Bytes::from_static(b"</html>")),
        ];
        let body = CacheValue::Stream(futures::stream::iter(chunks).boxed());

        cache.set("page:/wuwa", body, &CacheContext::default()).await;

        let entry = cache.get("page:/wuwa").await.unwrap();
        assert_eq!(entry.value, CachedValue::Bytes(b"<html>page</html>".to_vec()));
    }

    #[tokio::test]
    async fn revalidating_an_unknown_tag_is_a_noop() {
        let cache = handler();
        cache.set("k", b"body".to_vec().into(), &CacheContext::default()).await;

        cache.revalidate_tag(["never-used"]).await;

        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn clear_flushes_the_whole_namespace() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RenderCache::new(store.clone(), "irminsul:render:");
        let tagged = CacheContext { tags: vec!["t".to_string()], revalidate: None };

        cache.set("a", b"1".to_vec().into(), &tagged).await;
        cache.set("b", b"2".to_vec().into(), &CacheContext::default()).await;

        cache.clear().await;

        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn revalidate_window_becomes_store_ttl() {
        let cache = handler();
        let ctx = CacheContext { tags: vec![], revalidate: Some(30) };

        cache.set("k", b"body".to_vec().into(), &ctx).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::advance(std::time::Duration::from_secs(31)).await;
        assert!(cache.get("k").await.is_none());
    }

    /// A store where every command fails, simulating a hard outage.
    #[derive(Debug)]
    struct RejectingStore;

    #[async_trait]
    impl KeyValueStore for RejectingStore {
        fn name(&self) -> &'static str {
            "rejecting"
        }
        async fn get(&self, _: &str) -> Result<Option<String>, Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn set(&self, _: &str, _: &str, _: Option<u64>) -> Result<(), Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn sadd(&self, _: &str, _: &str) -> Result<(), Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn smembers(&self, _: &str) -> Result<Vec<String>, Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn del(&self, _: &[String]) -> Result<(), Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn keys(&self, _: &str) -> Result<Vec<String>, Error> {
            Err(Error::Connection("down".to_string()))
        }
        async fn quit(&self) -> Result<(), Error> {
            Err(Error::Connection("down".to_string()))
        }
    }

    #[tokio::test]
    async fn outage_degrades_every_operation_without_panicking() {
        let cache = RenderCache::new(Arc::new(RejectingStore), "irminsul:render:");
        let ctx = CacheContext { tags: vec!["t".to_string()], revalidate: Some(60) };

        assert!(cache.get("k").await.is_none());
        cache.set("k", b"body".to_vec().into(), &ctx).await;
        cache.revalidate_tag(["t", "u"]).await;
        cache.clear().await;
        cache.reset_request_cache();
        cache.shutdown().await;
    }
}
