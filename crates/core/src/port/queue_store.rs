// Queue Store Port
// Persistent per-requester list of pending links

use crate::domain::{LinkSet, NormalizedUrl, RequesterKey};
use crate::error::Result;
use async_trait::async_trait;

/// Result of an `add` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Links that were not already queued
    pub added: usize,
    /// Queue length after the call
    pub total: usize,
}

/// Queue Store trait
///
/// Read-modify-write operations on one key are serialized; different keys
/// never wait on each other.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append links, skipping ones already queued.
    async fn add(&self, key: &RequesterKey, urls: &[NormalizedUrl]) -> Result<AddOutcome>;

    /// Current queue in insertion order.
    async fn list(&self, key: &RequesterKey) -> Result<LinkSet>;

    /// Remove the whole queue for `key`.
    async fn clear(&self, key: &RequesterKey) -> Result<()>;

    /// Read the queue and, unless `retain`, delete it in the same step.
    async fn take(&self, key: &RequesterKey, retain: bool) -> Result<LinkSet>;
}

// ============================================================================
// In-memory implementation (tests, ephemeral runs)
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Same semantics as the durable store, without persistence.
    #[derive(Default)]
    pub struct InMemoryQueueStore {
        entries: Mutex<HashMap<RequesterKey, LinkSet>>,
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn add(&self, key: &RequesterKey, urls: &[NormalizedUrl]) -> Result<AddOutcome> {
            let mut entries = self.entries.lock().unwrap();
            let set = entries.entry(key.clone()).or_default();
            let added = set.extend(urls.iter().cloned());
            Ok(AddOutcome {
                added,
                total: set.len(),
            })
        }

        async fn list(&self, key: &RequesterKey) -> Result<LinkSet> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_default())
        }

        async fn clear(&self, key: &RequesterKey) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn take(&self, key: &RequesterKey, retain: bool) -> Result<LinkSet> {
            let mut entries = self.entries.lock().unwrap();
            let set = if retain {
                entries.get(key).cloned()
            } else {
                entries.remove(key)
            };
            Ok(set.unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn url(s: &str) -> NormalizedUrl {
            NormalizedUrl::parse(s).unwrap()
        }

        #[tokio::test]
        async fn test_add_dedups_across_calls() {
            let store = InMemoryQueueStore::new();
            let key = RequesterKey::new("cli", "local", "me");

            store
                .add(&key, &[url("https://github.com/alice")])
                .await
                .unwrap();
            let outcome = store
                .add(&key, &[url("https://github.com/alice/")])
                .await
                .unwrap();

            assert_eq!(outcome, AddOutcome { added: 0, total: 1 });
            assert_eq!(
                store.list(&key).await.unwrap().to_strings(),
                vec!["https://github.com/alice"]
            );
        }

        #[tokio::test]
        async fn test_take_retain_and_clear() {
            let store = InMemoryQueueStore::new();
            let key = RequesterKey::new("cli", "local", "me");
            store.add(&key, &[url("https://a.com")]).await.unwrap();

            assert_eq!(store.take(&key, true).await.unwrap().len(), 1);
            assert_eq!(store.take(&key, false).await.unwrap().len(), 1);
            assert!(store.list(&key).await.unwrap().is_empty());
        }
    }
}
