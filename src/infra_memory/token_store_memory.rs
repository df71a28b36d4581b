use crate::domain_model::UserId;
use crate::domain_port::*;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    token: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local token store with lazy expiry. Used for development and
/// tests; a single instance is not shared between processes.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: DashMap<UserId, Entry>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL for `user_id`, or `None` when nothing live is stored.
    pub fn ttl(&self, user_id: &UserId) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.entries.get(user_id)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(entry.expires_at - now)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(
        &self,
        user_id: &UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        self.entries.insert(
            user_id.clone(),
            Entry {
                token: token.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<String, TokenStoreError> {
        let now = Instant::now();
        let live = match self.entries.get(user_id) {
            Some(entry) if !entry.is_expired(now) => Some(entry.token.clone()),
            Some(_) => None,
            None => return Err(TokenStoreError::NotFound),
        };
        match live {
            Some(token) => Ok(token),
            None => {
                self.entries.remove_if(user_id, |_, e| e.is_expired(now));
                Err(TokenStoreError::NotFound)
            }
        }
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), TokenStoreError> {
        self.entries.remove(user_id);
        Ok(())
    }

    async fn replace_if_matches(
        &self,
        user_id: &UserId,
        expected: &str,
        new_token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let now = Instant::now();
        let expired = {
            let Some(mut entry) = self.entries.get_mut(user_id) else {
                return Err(TokenStoreError::NotFound);
            };
            if entry.is_expired(now) {
                true
            } else if entry.token != expected {
                return Err(TokenStoreError::Mismatch);
            } else {
                entry.token = new_token.to_string();
                entry.expires_at = now + ttl;
                return Ok(());
            }
        };
        if expired {
            self.entries.remove_if(user_id, |_, e| e.is_expired(now));
        }
        Err(TokenStoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        Ok(())
    }
}
