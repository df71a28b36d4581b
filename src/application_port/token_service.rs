use crate::domain_model::{Claims, TokenKind, TokenPair, UserId};
use crate::domain_port::TokenStoreError;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid token claims")]
    InvalidTokenClaims,
    #[error("token expired")]
    TokenExpired,
    #[error("token not found in storage")]
    TokenNotFound,
    #[error("token does not match stored token")]
    TokenMismatch,
    #[error("token store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenStoreError> for TokenError {
    fn from(err: TokenStoreError) -> Self {
        match err {
            TokenStoreError::NotFound => TokenError::TokenNotFound,
            TokenStoreError::Mismatch => TokenError::TokenMismatch,
            TokenStoreError::Unavailable(e) => TokenError::StoreUnavailable(e),
        }
    }
}

/// Outcome reported by the `ValidateToken` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Valid,
    Expired,
    Invalid,
}

impl TokenStatus {
    pub fn from_error(err: &TokenError) -> TokenStatus {
        match err {
            TokenError::TokenExpired => TokenStatus::Expired,
            _ => TokenStatus::Invalid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

/// Builds and parses signed claim sets. Stateless apart from the keys.
pub trait ClaimsCodec: Send + Sync {
    fn sign(&self, user_id: &UserId, email: &str, kind: TokenKind)
    -> Result<SignedToken, TokenError>;

    fn parse(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError>;
}

/// Refresh tokens are rotated only once their remaining lifetime drops below
/// `reuse_threshold`; until then the same token is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub reuse_threshold: Duration,
}

impl RotationPolicy {
    pub fn should_rotate(&self, time_until_expiry: Duration) -> bool {
        time_until_expiry < self.reuse_threshold
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        RotationPolicy {
            reuse_threshold: crate::domain_model::REFRESH_REUSE_THRESHOLD,
        }
    }
}

#[async_trait::async_trait]
pub trait TokenAuthority: Send + Sync {
    /// Signs a fresh pair and makes its refresh token the user's only live one.
    async fn generate_token_pair(&self, user_id: &UserId, email: &str)
    -> Result<TokenPair, TokenError>;

    /// Stateless check; returns the user the access token was issued to.
    async fn validate_access_token(&self, token: &str) -> Result<UserId, TokenError>;

    /// Checks the refresh token against the store and mints a new access
    /// token. The returned refresh token equals the input unless rotated.
    async fn validate_refresh_token(&self, token: &str) -> Result<TokenPair, TokenError>;

    async fn revoke_tokens(&self, user_id: &UserId) -> Result<(), TokenError>;
}
