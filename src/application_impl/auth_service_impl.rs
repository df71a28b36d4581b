use crate::application_port::{
    AccountError, AccountService, AuthError, AuthService, LoginInput, LoginResult, SignupInput,
    TokenAuthority,
};
use crate::domain_model::{AccountUser, NewAccount, RequestIdentity, TokenPair, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Span, info, warn};

pub struct RealAuthService {
    accounts: Arc<dyn AccountService>,
    authority: Arc<dyn TokenAuthority>,
    account_timeout: Duration,
    log: Span,
}

impl RealAuthService {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        authority: Arc<dyn TokenAuthority>,
        account_timeout: Duration,
        log: Span,
    ) -> Self {
        Self {
            accounts,
            authority,
            account_timeout,
            log,
        }
    }

    async fn account_call<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AccountError>> + Send,
    {
        match tokio::time::timeout(self.account_timeout, call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Account(AccountError::Unavailable(
                "account service timed out".to_string(),
            ))),
        }
    }

    async fn issue(&self, user: AccountUser) -> Result<LoginResult, AuthError> {
        let tokens = self
            .authority
            .generate_token_pair(&user.user_id, &user.email)
            .await?;
        Ok(LoginResult {
            user_id: user.user_id,
            email: user.email,
            tokens,
        })
    }

    fn require(field: &str, value: &str) -> Result<(), AuthError> {
        if value.trim().is_empty() {
            return Err(AuthError::InvalidArguments(format!("{} is required", field)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn generate_token(&self, user_id: &str, email: &str) -> Result<TokenPair, AuthError> {
        Self::require("user_id", user_id)?;
        Self::require("email", email)?;
        let user_id = UserId::parse(user_id)
            .map_err(|e| AuthError::InvalidArguments(e.to_string()))?;

        let registered = self.account_call(self.accounts.get_user(email)).await?;
        match registered {
            Some(user) if user.user_id == user_id && user.email == email => {}
            _ => {
                warn!(parent: &self.log, %user_id, email, "token requested for unregistered user");
                return Err(AuthError::PermissionDenied);
            }
        }

        Ok(self.authority.generate_token_pair(&user_id, email).await?)
    }

    async fn signup(&self, request: SignupInput) -> Result<LoginResult, AuthError> {
        let SignupInput {
            name,
            email,
            password,
            address,
        } = request;
        Self::require("name", &name)?;
        Self::require("email", &email)?;
        Self::require("password", &password)?;

        if self.account_call(self.accounts.get_user(&email)).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let created = self
            .account_call(self.accounts.create_user(NewAccount {
                name,
                email,
                password,
                address,
            }))
            .await
            .map_err(|e| match e {
                AuthError::Account(AccountError::AlreadyExists) => AuthError::UserExists,
                other => other,
            })?;

        info!(parent: &self.log, user_id = %created.user_id, "signed up new user");
        self.issue(created).await
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;
        Self::require("email", &email)?;
        Self::require("password", &password)?;

        let valid = self
            .account_call(self.accounts.check_password(&email, &password))
            .await?;
        if !valid {
            warn!(parent: &self.log, email, "invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .account_call(self.accounts.get_user(&email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        info!(parent: &self.log, user_id = %user.user_id, "user logged in");
        self.issue(user).await
    }

    async fn logout(&self, identity: &RequestIdentity) -> Result<(), AuthError> {
        self.authority.revoke_tokens(&identity.user_id).await?;
        info!(parent: &self.log, user_id = %identity.user_id, "user logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{
        FakeAccountService, JwtConfig, JwtHs256Codec, RealTokenAuthority, TokenSecrets,
    };
    use crate::application_port::{RotationPolicy, TokenError};
    use crate::domain_model::TokenLifetimes;
    use crate::infra_memory::MemoryTokenStore;

    struct Fixture {
        authority: Arc<RealTokenAuthority>,
        service: RealAuthService,
    }

    fn fixture(accounts: FakeAccountService) -> Fixture {
        let codec = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "tokenward.test".to_string(),
            lifetimes: TokenLifetimes::default(),
            secrets: TokenSecrets::new("auth-access", "auth-refresh").unwrap(),
        }));
        let authority = Arc::new(RealTokenAuthority::new(
            codec,
            Arc::new(MemoryTokenStore::new()),
            RotationPolicy::default(),
            Span::none(),
        ));
        let service = RealAuthService::new(
            Arc::new(accounts),
            authority.clone(),
            Duration::from_secs(5),
            Span::none(),
        );
        Fixture { authority, service }
    }

    fn signup_input(email: &str) -> SignupInput {
        SignupInput {
            name: "Grace".into(),
            email: email.into(),
            password: "s3cret".into(),
            address: "".into(),
        }
    }

    #[tokio::test]
    async fn signup_then_login_issues_working_tokens() {
        let f = fixture(FakeAccountService::new());
        let signed_up = f.service.signup(signup_input("grace@example.com")).await.unwrap();

        let logged_in = f
            .service
            .login(LoginInput {
                email: "grace@example.com".into(),
                password: "s3cret".into(),
            })
            .await
            .unwrap();

        assert_eq!(signed_up.user_id, logged_in.user_id);
        assert_eq!(
            f.authority
                .validate_access_token(&logged_in.tokens.access_token)
                .await,
            Ok(logged_in.user_id.clone())
        );
        // the login replaced the signup session
        assert_eq!(
            f.authority
                .validate_refresh_token(&signed_up.tokens.refresh_token)
                .await,
            Err(TokenError::TokenMismatch)
        );
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let f = fixture(FakeAccountService::new());
        f.service.signup(signup_input("twice@example.com")).await.unwrap();
        assert!(matches!(
            f.service.signup(signup_input("twice@example.com")).await,
            Err(AuthError::UserExists)
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let accounts = FakeAccountService::new()
            .with_user("Lin", "lin@example.com", "right")
            .unwrap();
        let f = fixture(accounts);
        assert!(matches!(
            f.service
                .login(LoginInput {
                    email: "lin@example.com".into(),
                    password: "wrong".into(),
                })
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn generate_token_requires_registered_pair() {
        let accounts = FakeAccountService::new()
            .with_user("Kim", "kim@example.com", "pw")
            .unwrap();
        let registered = accounts.get_user("kim@example.com").await.unwrap().unwrap();
        let f = fixture(accounts);

        let pair = f
            .service
            .generate_token(registered.user_id.as_str(), "kim@example.com")
            .await
            .unwrap();
        assert_eq!(
            f.authority.validate_access_token(&pair.access_token).await,
            Ok(registered.user_id.clone())
        );

        assert!(matches!(
            f.service
                .generate_token("someone-else", "kim@example.com")
                .await,
            Err(AuthError::PermissionDenied)
        ));
        assert!(matches!(
            f.service
                .generate_token(registered.user_id.as_str(), "nobody@example.com")
                .await,
            Err(AuthError::PermissionDenied)
        ));
        assert!(matches!(
            f.service.generate_token("", "kim@example.com").await,
            Err(AuthError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let f = fixture(FakeAccountService::new());
        let result = f.service.signup(signup_input("bye@example.com")).await.unwrap();

        f.service
            .logout(&RequestIdentity {
                user_id: result.user_id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(
            f.authority
                .validate_refresh_token(&result.tokens.refresh_token)
                .await,
            Err(TokenError::TokenNotFound)
        );
    }

    struct SlowAccounts;

    #[async_trait::async_trait]
    impl AccountService for SlowAccounts {
        async fn get_user(&self, _: &str) -> Result<Option<AccountUser>, AccountError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
        async fn create_user(&self, _: NewAccount) -> Result<AccountUser, AccountError> {
            Err(AccountError::Internal("unused".into()))
        }
        async fn check_password(&self, _: &str, _: &str) -> Result<bool, AccountError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn slow_account_service_times_out() {
        let f = fixture(FakeAccountService::new());
        let service = RealAuthService::new(
            Arc::new(SlowAccounts),
            f.authority.clone(),
            Duration::from_millis(20),
            Span::none(),
        );
        assert!(matches!(
            service.generate_token("u", "u@example.com").await,
            Err(AuthError::Account(AccountError::Unavailable(_)))
        ));
    }
}
