use crate::application_port::{AccountError, TokenError};
use crate::domain_model::{RequestIdentity, TokenPair, UserId};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not registered")]
    PermissionDenied,
    #[error("account error: {0}")]
    Account(#[from] AccountError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub email: String,
    pub tokens: TokenPair,
}

/// Account-aware entry points: each one confirms the user with the account
/// service before any token is minted.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn generate_token(&self, user_id: &str, email: &str) -> Result<TokenPair, AuthError>;
    async fn signup(&self, request: SignupInput) -> Result<LoginResult, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn logout(&self, identity: &RequestIdentity) -> Result<(), AuthError>;
}
