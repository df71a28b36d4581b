use crate::application_port::{ClaimsCodec, RotationPolicy, SignedToken, TokenAuthority, TokenError};
use crate::domain_model::{Claims, TokenKind, TokenPair, UserId};
use crate::domain_port::{TokenStore, TokenStoreError};
use crate::logger::token_fingerprint;
use chrono::Utc;
use std::sync::Arc;
use tracing::{Span, debug, error, info, warn};

pub struct RealTokenAuthority {
    codec: Arc<dyn ClaimsCodec>,
    store: Arc<dyn TokenStore>,
    policy: RotationPolicy,
    log: Span,
}

impl RealTokenAuthority {
    pub fn new(
        codec: Arc<dyn ClaimsCodec>,
        store: Arc<dyn TokenStore>,
        policy: RotationPolicy,
        log: Span,
    ) -> Self {
        Self {
            codec,
            store,
            policy,
            log,
        }
    }

    fn user_id_of(claims: &Claims) -> Result<UserId, TokenError> {
        UserId::parse(claims.user_id.as_str()).map_err(|_| TokenError::InvalidTokenClaims)
    }

    fn store_error(&self, user_id: &UserId, op: &'static str, err: TokenStoreError) -> TokenError {
        if let TokenStoreError::Unavailable(e) = &err {
            error!(parent: &self.log, %user_id, op, error = %e, "token store unavailable");
        }
        TokenError::from(err)
    }

    /// Signs a refresh token and stores it with a TTL equal to the lifetime
    /// recorded in its claims.
    async fn issue_refresh_token(
        &self,
        user_id: &UserId,
        email: &str,
    ) -> Result<SignedToken, TokenError> {
        let signed = self.codec.sign(user_id, email, TokenKind::Refresh)?;
        self.store
            .put(user_id, &signed.token, signed.claims.lifetime())
            .await
            .map_err(|e| self.store_error(user_id, "put", e))?;
        Ok(signed)
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &UserId,
        email: &str,
        current: &str,
    ) -> Result<String, TokenError> {
        let next = self.codec.sign(user_id, email, TokenKind::Refresh)?;
        match self
            .store
            .replace_if_matches(user_id, current, &next.token, next.claims.lifetime())
            .await
        {
            Ok(()) => Ok(next.token),
            Err(TokenStoreError::Mismatch) => {
                warn!(
                    parent: &self.log,
                    %user_id,
                    presented = %token_fingerprint(current),
                    "refresh token replaced concurrently, rotation lost"
                );
                Err(TokenError::TokenMismatch)
            }
            Err(e) => Err(self.store_error(user_id, "replace_if_matches", e)),
        }
    }
}

#[async_trait::async_trait]
impl TokenAuthority for RealTokenAuthority {
    async fn generate_token_pair(
        &self,
        user_id: &UserId,
        email: &str,
    ) -> Result<TokenPair, TokenError> {
        let access = self.codec.sign(user_id, email, TokenKind::Access)?;
        let refresh = self.issue_refresh_token(user_id, email).await?;

        info!(parent: &self.log, %user_id, jti = %refresh.claims.jti, "issued token pair");
        Ok(TokenPair::new(access.token, refresh.token))
    }

    async fn validate_access_token(&self, token: &str) -> Result<UserId, TokenError> {
        let claims = self
            .codec
            .parse(token, TokenKind::Access)
            .inspect_err(|e| {
                if *e != TokenError::TokenExpired {
                    debug!(parent: &self.log, error = %e, "rejected access token");
                }
            })?;
        Self::user_id_of(&claims)
    }

    async fn validate_refresh_token(&self, token: &str) -> Result<TokenPair, TokenError> {
        let claims = self
            .codec
            .parse(token, TokenKind::Refresh)
            .inspect_err(|e| debug!(parent: &self.log, error = %e, "rejected refresh token"))?;
        let user_id = Self::user_id_of(&claims)?;

        let stored = match self.store.get(&user_id).await {
            Ok(stored) => stored,
            Err(TokenStoreError::NotFound) => {
                info!(parent: &self.log, %user_id, "no stored refresh token");
                return Err(TokenError::TokenNotFound);
            }
            Err(e) => return Err(self.store_error(&user_id, "get", e)),
        };

        if stored.as_bytes() != token.as_bytes() {
            warn!(
                parent: &self.log,
                %user_id,
                presented = %token_fingerprint(token),
                stored = %token_fingerprint(&stored),
                "refresh token does not match stored token, possible reuse"
            );
            return Err(TokenError::TokenMismatch);
        }

        let access = self.codec.sign(&user_id, &claims.email, TokenKind::Access)?;

        let time_until_expiry = claims.time_until_expiry(Utc::now());
        let refresh_token = if self.policy.should_rotate(time_until_expiry) {
            info!(
                parent: &self.log,
                %user_id,
                ?time_until_expiry,
                "refresh token close to expiry, rotating"
            );
            self.rotate_refresh_token(&user_id, &claims.email, token)
                .await?
        } else {
            debug!(
                parent: &self.log,
                %user_id,
                ?time_until_expiry,
                "reusing existing refresh token"
            );
            stored
        };

        Ok(TokenPair::new(access.token, refresh_token))
    }

    async fn revoke_tokens(&self, user_id: &UserId) -> Result<(), TokenError> {
        self.store
            .delete(user_id)
            .await
            .map_err(|e| self.store_error(user_id, "delete", e))?;
        info!(parent: &self.log, %user_id, "revoked refresh token");
        Ok(())
    }
}
