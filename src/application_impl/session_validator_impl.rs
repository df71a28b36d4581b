use crate::application_port::{
    SessionError, SessionRejection, SessionValidator, TokenAuthority, TokenError, ValidatedSession,
};
use crate::domain_model::{RequestIdentity, TokenPair};
use std::sync::Arc;
use tracing::{Span, debug, error, info, warn};

/// Cascade run by request middleware: access token first, refresh token as
/// the fallback for an expired or missing access token.
pub struct RealSessionValidator {
    authority: Arc<dyn TokenAuthority>,
    log: Span,
}

impl RealSessionValidator {
    pub fn new(authority: Arc<dyn TokenAuthority>, log: Span) -> Self {
        Self { authority, log }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<ValidatedSession, SessionError> {
        let tokens = match self.authority.validate_refresh_token(refresh_token).await {
            Ok(tokens) => tokens,
            Err(TokenError::StoreUnavailable(e)) | Err(TokenError::Internal(e)) => {
                error!(parent: &self.log, error = %e, "session refresh failed internally");
                return Err(SessionError::Internal(e));
            }
            Err(TokenError::TokenMismatch) => {
                warn!(parent: &self.log, "stale or reused refresh token presented");
                return Err(SessionError::Unauthenticated(
                    SessionRejection::SessionExpired,
                ));
            }
            Err(e) => {
                info!(parent: &self.log, error = %e, "session expired");
                return Err(SessionError::Unauthenticated(
                    SessionRejection::SessionExpired,
                ));
            }
        };

        let user_id = self
            .authority
            .validate_access_token(&tokens.access_token)
            .await
            .map_err(|e| {
                error!(parent: &self.log, error = %e, "freshly minted access token rejected");
                SessionError::Unauthenticated(SessionRejection::InvalidSession)
            })?;

        debug!(parent: &self.log, %user_id, "session refreshed");
        Ok(ValidatedSession {
            identity: RequestIdentity { user_id },
            tokens,
            refreshed: true,
        })
    }
}

#[async_trait::async_trait]
impl SessionValidator for RealSessionValidator {
    async fn validate_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ValidatedSession, SessionError> {
        if access_token.is_empty() && refresh_token.is_empty() {
            return Err(SessionError::Unauthenticated(SessionRejection::NoSession));
        }

        if !access_token.is_empty() {
            match self.authority.validate_access_token(access_token).await {
                Ok(user_id) => {
                    return Ok(ValidatedSession {
                        identity: RequestIdentity { user_id },
                        tokens: TokenPair::new(access_token, refresh_token),
                        refreshed: false,
                    });
                }
                Err(TokenError::TokenExpired) if !refresh_token.is_empty() => {}
                // expired with nothing to refresh it is not a usable session
                Err(TokenError::TokenExpired) => {
                    return Err(SessionError::Unauthenticated(
                        SessionRejection::InvalidSession,
                    ));
                }
                Err(e) => {
                    debug!(parent: &self.log, error = %e, "invalid access token in session");
                    return Err(SessionError::Unauthenticated(
                        SessionRejection::InvalidSession,
                    ));
                }
            }
        }

        self.refresh_session(refresh_token).await
    }
}
