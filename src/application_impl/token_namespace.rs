use crate::domain_port::{StoreError, TokenStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Unpredictable opaque id; 122 random bits as 32 hex chars.
pub fn new_token_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// One keyspace of the ephemeral store, typed by payload. Keys are
/// `{prefix}:{id}`, so an id presented to the wrong namespace can never
/// resolve.
pub struct TokenNamespace<T> {
    store: Arc<dyn TokenStore>,
    prefix: &'static str,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TokenNamespace<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn TokenStore>, prefix: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            prefix,
            ttl,
            _payload: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn encode(&self, payload: &T) -> Result<String, StoreError> {
        serde_json::to_string(payload).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<T, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Store under a fresh id and return it.
    pub async fn issue(&self, payload: &T) -> Result<String, StoreError> {
        let id = new_token_id();
        self.put(&id, payload).await?;
        Ok(id)
    }

    /// Store under a caller-chosen id, starting a fresh TTL.
    pub async fn put(&self, id: &str, payload: &T) -> Result<(), StoreError> {
        let raw = self.encode(payload)?;
        self.store.put(&self.key(id), &raw, self.ttl).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&self.key(id)).await? {
            Some(raw) => Ok(Some(self.decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Rewrite a live entry without extending its deadline. False when the
    /// entry is gone.
    pub async fn update_keep_ttl(&self, id: &str, payload: &T) -> Result<bool, StoreError> {
        let raw = self.encode(payload)?;
        self.store.replace_keep_ttl(&self.key(id), &raw).await
    }

    /// Atomic read-and-destroy.
    pub async fn take(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.take(&self.key(id)).await? {
            Some(raw) => Ok(Some(self.decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.store.remove(&self.key(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryTokenStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn namespace(ttl: Duration) -> TokenNamespace<Note> {
        TokenNamespace::new(Arc::new(MemoryTokenStore::new()), "note", ttl)
    }

    #[tokio::test]
    async fn issued_payload_comes_back_until_taken() {
        let ns = namespace(Duration::from_secs(60));
        let note = Note {
            text: "hello".into(),
        };

        let id = ns.issue(&note).await.unwrap();
        assert_eq!(ns.get(&id).await.unwrap(), Some(note.clone()));

        assert_eq!(ns.take(&id).await.unwrap(), Some(note));
        assert_eq!(ns.get(&id).await.unwrap(), None);
        assert_eq!(ns.take(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let ns = namespace(Duration::from_millis(40));
        let id = ns.issue(&Note { text: "gone".into() }).await.unwrap();

        assert!(ns.get(&id).await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ns.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_do_not_cross_namespaces() {
        let store = Arc::new(MemoryTokenStore::new());
        let left: TokenNamespace<Note> =
            TokenNamespace::new(store.clone(), "left", Duration::from_secs(60));
        let right: TokenNamespace<Note> =
            TokenNamespace::new(store, "right", Duration::from_secs(60));

        let id = left.issue(&Note { text: "x".into() }).await.unwrap();
        assert!(right.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_keep_ttl_preserves_deadline() {
        let ns = namespace(Duration::from_millis(80));
        let id = ns.issue(&Note { text: "v1".into() }).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ns.update_keep_ttl(&id, &Note { text: "v2".into() }).await.unwrap());
        assert_eq!(ns.get(&id).await.unwrap().unwrap().text, "v2");

        // The rewrite must not have restarted the clock.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ns.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_keep_ttl_rejects_absent_entries() {
        let ns = namespace(Duration::from_secs(60));
        let updated = ns
            .update_keep_ttl("missing", &Note { text: "x".into() })
            .await
            .unwrap();
        assert!(!updated);
    }
}
