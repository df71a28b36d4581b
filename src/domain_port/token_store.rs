use crate::domain_model::UserId;
use std::time::Duration;

/// Key-value contract holding the single live refresh token per user.
///
/// Keyed by user id, value is the refresh token string, TTL equals the
/// refresh token lifetime. A timeout or transport failure must come back as
/// [`TokenStoreError::Unavailable`], never as [`TokenStoreError::NotFound`].
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Unconditional overwrite of the value and TTL for `user_id`.
    async fn put(&self, user_id: &UserId, token: &str, ttl: Duration)
    -> Result<(), TokenStoreError>;

    /// Current token for `user_id`; `NotFound` if absent or expired.
    async fn get(&self, user_id: &UserId) -> Result<String, TokenStoreError>;

    /// Idempotent: deleting an absent key succeeds.
    async fn delete(&self, user_id: &UserId) -> Result<(), TokenStoreError>;

    /// Atomically replace the stored value with `new_token` only when it
    /// still equals `expected`.
    async fn replace_if_matches(
        &self,
        user_id: &UserId,
        expected: &str,
        new_token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError>;

    async fn ping(&self) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenStoreError {
    #[error("no token stored for user")]
    NotFound,
    #[error("stored token does not match the expected value")]
    Mismatch,
    #[error("token store unavailable: {0}")]
    Unavailable(String),
}
