use std::time::Duration;

/// Keyed ephemeral state with per-entry TTL. Every token namespace (primary
/// session, OTP session, password-reset grant, session owner slots) is built
/// on this port; implementations must never return an expired entry.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Create or overwrite, starting a fresh TTL.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Create only if no live entry holds the key. Returns whether the claim
    /// won.
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite a live entry without extending its deadline. False when the
    /// key is absent or expired.
    async fn replace_keep_ttl(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Atomic read-and-destroy.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Destroy. Idempotent.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Destroy only if the live value equals `expected`. Returns whether a
    /// removal happened.
    async fn remove_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
    #[error("payload codec error: {0}")]
    Codec(String),
}
