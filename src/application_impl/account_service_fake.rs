use crate::application_port::{AccountError, AccountService};
use crate::domain_model::{AccountUser, NewAccount, UserId};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

struct FakeAccount {
    user: AccountUser,
    password_digest: String,
}

/// In-memory stand-in for the account service.
#[derive(Default)]
pub struct FakeAccountService {
    accounts: DashMap<String, FakeAccount>,
}

impl FakeAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, name: &str, email: &str, password: &str) -> Result<Self, AccountError> {
        let user = AccountUser {
            user_id: fake_id(email)?,
            email: email.to_string(),
            name: name.to_string(),
        };
        self.accounts.insert(
            email.to_string(),
            FakeAccount {
                user,
                password_digest: digest(password),
            },
        );
        Ok(self)
    }
}

#[async_trait::async_trait]
impl AccountService for FakeAccountService {
    async fn get_user(&self, email: &str) -> Result<Option<AccountUser>, AccountError> {
        Ok(self.accounts.get(email).map(|a| a.user.clone()))
    }

    async fn create_user(&self, account: NewAccount) -> Result<AccountUser, AccountError> {
        let user = AccountUser {
            user_id: fake_id(&account.email)?,
            email: account.email.clone(),
            name: account.name,
        };
        let mut created = false;
        let entry = self.accounts.entry(account.email).or_insert_with(|| {
            created = true;
            FakeAccount {
                user: user.clone(),
                password_digest: digest(&account.password),
            }
        });
        drop(entry);
        if !created {
            return Err(AccountError::AlreadyExists);
        }
        Ok(user)
    }

    async fn check_password(&self, email: &str, password: &str) -> Result<bool, AccountError> {
        Ok(self
            .accounts
            .get(email)
            .is_some_and(|a| a.password_digest == digest(password)))
    }
}

// UUIDv5 of the email, so restarts hand out the same identities.
fn fake_id(email: &str) -> Result<UserId, AccountError> {
    let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, email.as_bytes());
    UserId::parse(id.to_string()).map_err(|e| AccountError::Internal(e.to_string()))
}

fn digest(password: &str) -> String {
    hex::encode(&Sha256::digest(password.as_bytes())[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Ada".into(),
            email: email.into(),
            password: "hunter22".into(),
            address: "".into(),
        }
    }

    #[tokio::test]
    async fn created_users_can_be_found_and_checked() {
        let accounts = FakeAccountService::new();
        let user = accounts.create_user(new_account("ada@example.com")).await.unwrap();

        assert_eq!(accounts.get_user("ada@example.com").await, Ok(Some(user)));
        assert_eq!(accounts.check_password("ada@example.com", "hunter22").await, Ok(true));
        assert_eq!(accounts.check_password("ada@example.com", "wrong").await, Ok(false));
        assert_eq!(accounts.check_password("nobody@example.com", "hunter22").await, Ok(false));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let accounts = FakeAccountService::new();
        accounts.create_user(new_account("dup@example.com")).await.unwrap();
        assert_eq!(
            accounts.create_user(new_account("dup@example.com")).await,
            Err(AccountError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn ids_are_deterministic_per_email() {
        let a = FakeAccountService::new().with_user("A", "same@example.com", "pw").unwrap();
        let b = FakeAccountService::new();
        let created = b.create_user(new_account("same@example.com")).await.unwrap();
        let seeded = a.get_user("same@example.com").await.unwrap().unwrap();
        assert_eq!(seeded.user_id, created.user_id);
    }
}
