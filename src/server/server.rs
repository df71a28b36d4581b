use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::TokenLifetimes;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub token_authority: Arc<dyn TokenAuthority>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub token_store: Arc<dyn TokenStore>,
}

impl Server {
    /// Wires the services on top of an already constructed store and
    /// account backend.
    pub fn assemble(
        jwt: JwtConfig,
        policy: RotationPolicy,
        token_store: Arc<dyn TokenStore>,
        accounts: Arc<dyn AccountService>,
        account_timeout: Duration,
    ) -> Self {
        let codec: Arc<dyn ClaimsCodec> = Arc::new(JwtHs256Codec::new(jwt));
        let token_authority: Arc<dyn TokenAuthority> = Arc::new(RealTokenAuthority::new(
            codec,
            token_store.clone(),
            policy,
            Logger::component("token_authority"),
        ));
        let session_validator: Arc<dyn SessionValidator> = Arc::new(RealSessionValidator::new(
            token_authority.clone(),
            Logger::component("session_validator"),
        ));
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            accounts,
            token_authority.clone(),
            account_timeout,
            Logger::component("auth_service"),
        ));

        Self {
            auth_service,
            token_authority,
            session_validator,
            token_store,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token = &settings.token;
        let jwt = JwtConfig {
            issuer: token.issuer.clone(),
            lifetimes: TokenLifetimes {
                access: token.access_ttl(),
                refresh: token.refresh_ttl(),
            },
            secrets: TokenSecrets::new(token.access_secret.as_str(), token.refresh_secret.as_str())?,
        };
        let policy = RotationPolicy {
            reuse_threshold: token.reuse_threshold(),
        };

        let token_store: Arc<dyn TokenStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "redis" => {
                let redis_client = redis::Client::open(settings.store.redis_url.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisTokenStore::new(
                    redis_manager,
                    settings.store.key_prefix.clone(),
                    settings.store.op_timeout(),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };
        token_store.ping().await?;

        let accounts: Arc<dyn AccountService> = match settings.account.backend.as_str() {
            "fake" => Arc::new(FakeAccountService::new()),
            other => return Err(anyhow::anyhow!("Unknown account backend: {}", other)),
        };

        info!(
            store = settings.store.backend.as_str(),
            account = settings.account.backend.as_str(),
            "server started"
        );

        Ok(Self::assemble(
            jwt,
            policy,
            token_store,
            accounts,
            settings.account.timeout(),
        ))
    }
}
