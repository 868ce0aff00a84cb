use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A stored render-cache entry.
///
/// Wire format (JSON): `{"value": <byte array | JSON>, "lastModified": <epoch ms>, "tags": [..]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub value: CachedValue,
    /// Unix timestamp in milliseconds at which the entry was written.
    pub last_modified: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The payload of a cache entry.
///
/// A previously-streamed response body is stored as a buffered byte array;
/// everything else is stored as its JSON representation. The two are
/// distinguished structurally (a JSON array of byte values reads back as
/// `Bytes`), so no discriminant is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CachedValue {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

/// A value handed to `set`, before buffering.
///
/// Streamed bodies cannot be persisted as-is: the store only takes owned
/// payloads, so `into_stored` drains the producer to completion first.
pub enum CacheValue {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl CacheValue {
    /// Buffer this value into its storable form. Draining a stream consumes
    /// it fully; a mid-stream error aborts the write.
    pub async fn into_stored(self) -> Result<CachedValue, Error> {
        match self {
            CacheValue::Bytes(bytes) => Ok(CachedValue::Bytes(bytes)),
            CacheValue::Json(value) => Ok(CachedValue::Json(value)),
            CacheValue::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| {
                        Error::Serialization(format!("Body stream failed mid-drain: {e}"))
                    })?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(CachedValue::Bytes(buf))
            }
        }
    }
}

impl std::fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheValue::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            CacheValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            CacheValue::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(bytes: Vec<u8>) -> Self {
        CacheValue::Bytes(bytes)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Json(value)
    }
}

/// Per-write context from the render pipeline.
#[derive(Debug, Clone, Default)]
pub struct CacheContext {
    /// Tags to index this entry under for later invalidation.
    pub tags: Vec<String>,
    /// Revalidation window in seconds; written as the store TTL when set.
    pub revalidate: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn entry_wire_format_round_trips() {
        let entry = CacheEntry {
            value: CachedValue::Json(serde_json::json!({"page": "/characters/seele"})),
            last_modified: 1_700_000_000_000,
            tags: vec!["characters".to_string()],
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"lastModified\":1700000000000"));

        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.last_modified, entry.last_modified);
        assert_eq!(back.tags, entry.tags);
        assert_eq!(back.value, entry.value);
    }

    #[test]
    fn buffered_body_reads_back_as_bytes() {
        let entry = CacheEntry {
            value: CachedValue::Bytes(b"<html>ok</html>".to_vec()),
            last_modified: 0,
            tags: vec![],
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        match back.value {
            CachedValue::Bytes(b) => assert_eq!(b, b"<html>ok</html>"),
            CachedValue::Json(v) => panic!("expected bytes, got {v:?}"),
        }
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let back: CacheEntry =
            serde_json::from_str(r#"{"value": {"a": 1}, "lastModified": 5}"#).unwrap();
        assert!(back.tags.is_empty());
    }

    #[tokio::test]
    async fn stream_is_fully_drained_before_storage() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"<html>")),
            Ok(Bytes::from_static(b"body")),
            Ok(Bytes::from_static(b"</html>")),
        ];
        let value = CacheValue::Stream(stream::iter(chunks).boxed());

        let stored = value.into_stored().await.unwrap();
        assert_eq!(stored, CachedValue::Bytes(b"<html>body</html>".to_vec()));
    }

    #[tokio::test]
    async fn stream_error_aborts_the_write() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone")),
        ];
        let value = CacheValue::Stream(stream::iter(chunks).boxed());

        assert!(value.into_stored().await.is_err());
    }
}
