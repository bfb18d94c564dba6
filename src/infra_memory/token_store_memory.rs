use crate::domain_port::{StoreError, TokenStore};
use dashmap::DashMap;
use std::cell::Cell;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: Instant,
}

impl StoredEntry {
    fn expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process `TokenStore` for development and tests. Expired entries are
/// reclaimed on access; `sweep_expired` catches keys nobody touches again.
pub struct MemoryTokenStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.expired(now));
    }

    fn fresh(value: &str, ttl: Duration) -> StoredEntry {
        StoredEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), Self::fresh(value, ttl));
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let fresh = Self::fresh(value, ttl);
        let inserted = Cell::new(false);

        // Single entry lock: the claim wins only over an absent or expired
        // holder.
        self.entries
            .entry(key.to_string())
            .and_modify(|existing| {
                if existing.expired(now) {
                    *existing = fresh.clone();
                    inserted.set(true);
                }
            })
            .or_insert_with(|| {
                inserted.set(true);
                fresh.clone()
            });

        Ok(inserted.get())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let value = self.entries.get(key).and_then(|entry| {
            if entry.expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        });
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expired(now));
        }
        Ok(value)
    }

    async fn replace_keep_ttl(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut replaced = false;
        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.expired(now) {
                entry.value = value.to_string();
                replaced = true;
            }
        }
        if !replaced {
            self.entries.remove_if(key, |_, entry| entry.expired(now));
        }
        Ok(replaced)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        match self.entries.remove(key) {
            Some((_, entry)) if !entry.expired(now) => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn remove_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, entry| !entry.expired(now) && entry.value == expected);
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(60);
    const SHORT: Duration = Duration::from_millis(40);

    #[tokio::test]
    async fn put_if_absent_claims_once() {
        let store = MemoryTokenStore::new();

        assert!(store.put_if_absent("k", "a", TTL).await.unwrap());
        assert!(!store.put_if_absent("k", "b", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn put_if_absent_wins_over_an_expired_holder() {
        let store = MemoryTokenStore::new();

        store.put("k", "stale", SHORT).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.put_if_absent("k", "fresh", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let store = Arc::new(MemoryTokenStore::new());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.put_if_absent("k", &format!("v{i}"), TTL).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryTokenStore::new();

        store.put("k", "v", SHORT).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.take("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_keep_ttl_only_touches_live_entries() {
        let store = MemoryTokenStore::new();

        assert!(!store.replace_keep_ttl("k", "v").await.unwrap());

        store.put("k", "v1", SHORT).await.unwrap();
        assert!(store.replace_keep_ttl("k", "v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        // The deadline is the original one.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.replace_keep_ttl("k", "v3").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn take_returns_the_value_exactly_once() {
        let store = MemoryTokenStore::new();

        store.put("k", "v", TTL).await.unwrap();
        assert_eq!(store.take("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.take("k").await.unwrap().is_none());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_if_equals_compares_before_removing() {
        let store = MemoryTokenStore::new();

        store.put("k", "mine", TTL).await.unwrap();
        assert!(!store.remove_if_equals("k", "theirs").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("mine"));

        assert!(store.remove_if_equals("k", "mine").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.remove_if_equals("k", "mine").await.unwrap());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_entries() {
        let store = MemoryTokenStore::new();

        store.put("old", "v", SHORT).await.unwrap();
        store.put("new", "v", TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        store.sweep_expired();
        assert_eq!(store.entries.len(), 1);
        assert!(store.get("new").await.unwrap().is_some());
    }
}
