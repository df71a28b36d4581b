use crate::application_port::TokenStatus;
use crate::domain_model::{RequestIdentity, TokenPair};

/// Why a presented session did not authenticate. Kept for logging; callers
/// outside the service only see the coarse [`TokenStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    NoSession,
    SessionExpired,
    InvalidSession,
}

impl SessionRejection {
    pub fn status(&self) -> TokenStatus {
        match self {
            SessionRejection::NoSession | SessionRejection::SessionExpired => TokenStatus::Expired,
            SessionRejection::InvalidSession => TokenStatus::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("unauthenticated: {0:?}")]
    Unauthenticated(SessionRejection),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    pub identity: RequestIdentity,
    pub tokens: TokenPair,
    /// True when `tokens` differs from the presented pair and must be
    /// persisted by the caller.
    pub refreshed: bool,
}

#[async_trait::async_trait]
pub trait SessionValidator: Send + Sync {
    /// Empty strings stand for absent tokens.
    async fn validate_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ValidatedSession, SessionError>;
}
