use crate::domain_model::{AccountUser, NewAccount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("account already exists")]
    AlreadyExists,
    #[error("account service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Capability exposed by the account service, which owns user records and
/// password hashes.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    async fn get_user(&self, email: &str) -> Result<Option<AccountUser>, AccountError>;
    async fn create_user(&self, account: NewAccount) -> Result<AccountUser, AccountError>;
    async fn check_password(&self, email: &str, password: &str) -> Result<bool, AccountError>;
}
