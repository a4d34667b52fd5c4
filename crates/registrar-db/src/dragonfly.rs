//! `Dragonfly` (Redis-compatible) mirror store.
//!
//! Each mirror document is stored as a JSON string under a prefixed key.
//! The document's own `_id` stays unprefixed so readers see the same
//! identifier regardless of how the store is namespaced. Reads accept any
//! JSON object so documents written by other tools can be repaired in place.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{prefix}student_{id}` | JSON | Student document |
//! | `{prefix}course_{id}` | JSON | Course document |
//! | `{prefix}enrollment_{id}` | JSON | Enrollment document |

use async_trait::async_trait;
use fred::prelude::*;
use registrar_types::MirrorKey;

use crate::error::MirrorError;
use crate::mirror::{MirrorDocument, MirrorStore};

/// Default namespace for mirror document keys.
pub const DEFAULT_KEY_PREFIX: &str = "mirror:";

/// Connection handle to a `Dragonfly` instance used as the mirror store.
///
/// Wraps a [`fred::prelude::Client`]. The client is opened once at process
/// start and closed with [`MirrorStore::close`] at shutdown.
#[derive(Clone)]
pub struct DragonflyMirror {
    client: Client,
    key_prefix: String,
}

impl DragonflyMirror {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Unavailable`] if the URL cannot be parsed or
    /// the connection fails.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, MirrorError> {
        let config = Config::from_url(url)
            .map_err(|e| MirrorError::Unavailable(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(key_prefix, "Connected to Dragonfly mirror");
        Ok(Self {
            client,
            key_prefix: key_prefix.to_owned(),
        })
    }

    /// The storage key for a document id.
    fn storage_key(&self, id: &str) -> String {
        format!("{}{id}", self.key_prefix)
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Unavailable`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), MirrorError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }
}

#[async_trait]
impl MirrorStore for DragonflyMirror {
    async fn fetch(&self, key: &MirrorKey) -> Result<Option<MirrorDocument>, MirrorError> {
        let storage_key = self.storage_key(key.as_str());
        let value: Option<String> = self.client.get(&storage_key).await?;
        let Some(json) = value else {
            return Ok(None);
        };
        let raw: serde_json::Value =
            serde_json::from_str(&json).map_err(|e| MirrorError::Malformed {
                key: storage_key,
                reason: e.to_string(),
            })?;
        MirrorDocument::from_stored(key, raw).map(Some)
    }

    async fn store(&self, document: &MirrorDocument) -> Result<(), MirrorError> {
        let storage_key = self.storage_key(&document.id);
        let json = serde_json::to_string(document)?;
        let _: () = self
            .client
            .set(&storage_key, json.as_str(), None, None, false)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &MirrorKey) -> Result<bool, MirrorError> {
        let removed: u32 = self.client.del(self.storage_key(key.as_str())).await?;
        Ok(removed > 0)
    }

    async fn close(&self) -> Result<(), MirrorError> {
        self.client.quit().await?;
        tracing::info!("Dragonfly mirror connection closed");
        Ok(())
    }
}
