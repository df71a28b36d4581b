use crate::application_port::{ClaimsCodec, SignedToken, TokenError};
use crate::domain_model::{Claims, TokenKind, TokenLifetimes, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;

/// Signing keys, one per token kind. The two keys must differ.
#[derive(Clone)]
pub struct TokenSecrets {
    access: Vec<u8>,
    refresh: Vec<u8>,
}

impl TokenSecrets {
    pub fn new(access: impl Into<Vec<u8>>, refresh: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let access = access.into();
        let refresh = refresh.into();
        if access.is_empty() || refresh.is_empty() {
            return Err(TokenError::Internal("token secrets must not be empty".into()));
        }
        if access == refresh {
            return Err(TokenError::Internal(
                "access and refresh secrets must differ".into(),
            ));
        }
        Ok(TokenSecrets { access, refresh })
    }

    fn for_kind(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSecrets").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub lifetimes: TokenLifetimes,
    pub secrets: TokenSecrets,
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KindKeys {
    fn from_secret(secret: &[u8]) -> Self {
        KindKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HS256 compact JWTs.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    access: KindKeys,
    refresh: KindKeys,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let access = KindKeys::from_secret(cfg.secrets.for_kind(TokenKind::Access));
        let refresh = KindKeys::from_secret(cfg.secrets.for_kind(TokenKind::Refresh));
        JwtHs256Codec {
            cfg,
            access,
            refresh,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.cfg.lifetimes
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 0;
        v.validate_exp = true;
        v.validate_nbf = true;
        v.set_issuer(&[self.cfg.issuer.as_str()]);
        v.set_required_spec_claims(&["exp", "nbf", "sub", "iss"]);
        v
    }

    /// Signs a token as if issued at `issued_at`.
    pub fn sign_at(
        &self,
        user_id: &UserId,
        email: &str,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<SignedToken, TokenError> {
        let ttl = chrono::Duration::from_std(self.cfg.lifetimes.for_kind(kind))
            .map_err(|e| TokenError::Internal(e.to_string()))?;
        let iat = issued_at.timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            token_kind: kind,
            iss: self.cfg.issuer.clone(),
            sub: user_id.to_string(),
            iat,
            nbf: iat,
            exp: (issued_at + ttl).timestamp(),
            jti: Self::gen_jti(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| TokenError::Internal(e.to_string()))?;
        Ok(SignedToken { token, claims })
    }
}

impl ClaimsCodec for JwtHs256Codec {
    fn sign(
        &self,
        user_id: &UserId,
        email: &str,
        kind: TokenKind,
    ) -> Result<SignedToken, TokenError> {
        self.sign_at(user_id, email, kind, Utc::now())
    }

    fn parse(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                ErrorKind::Json(_)
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidIssuer
                | ErrorKind::ImmatureSignature => TokenError::InvalidTokenClaims,
                _ => TokenError::InvalidToken,
            })?;
        let claims = data.claims;
        if claims.token_kind != kind {
            return Err(TokenError::InvalidTokenClaims);
        }
        if claims.sub != claims.user_id || claims.jti.is_empty() {
            return Err(TokenError::InvalidTokenClaims);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ACCESS_SECRET: &[u8] = b"access-secret-for-tests";
    const REFRESH_SECRET: &[u8] = b"refresh-secret-for-tests";

    fn codec() -> JwtHs256Codec {
        JwtHs256Codec::new(JwtConfig {
            issuer: "tokenward.test".to_string(),
            lifetimes: TokenLifetimes::default(),
            secrets: TokenSecrets::new(ACCESS_SECRET, REFRESH_SECRET).unwrap(),
        })
    }

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn access_token_round_trips() {
        let codec = codec();
        let signed = codec.sign(&uid("user-1"), "a@b.c", TokenKind::Access).unwrap();
        assert_eq!(signed.token.split('.').count(), 3);

        let claims = codec.parse(&signed.token, TokenKind::Access).unwrap();
        assert_eq!(claims, signed.claims);
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@b.c");
        assert_eq!(claims.token_kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn empty_email_is_allowed() {
        let codec = codec();
        let signed = codec.sign(&uid("user-2"), "", TokenKind::Access).unwrap();
        let claims = codec.parse(&signed.token, TokenKind::Access).unwrap();
        assert_eq!(claims.email, "");
        assert_eq!(claims.user_id, "user-2");
    }

    #[test]
    fn refresh_token_carries_seven_day_lifetime() {
        let codec = codec();
        let signed = codec.sign(&uid("user-3"), "x@y.z", TokenKind::Refresh).unwrap();
        let claims = codec.parse(&signed.token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let codec = codec();
        let a = codec.sign(&uid("u"), "", TokenKind::Access).unwrap();
        let b = codec.sign(&uid("u"), "", TokenKind::Access).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expired_token_reports_expiry() {
        let codec = codec();
        let signed = codec
            .sign_at(
                &uid("user-4"),
                "",
                TokenKind::Access,
                Utc::now() - Duration::minutes(16),
            )
            .unwrap();
        assert_eq!(
            codec.parse(&signed.token, TokenKind::Access),
            Err(TokenError::TokenExpired)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec();
        assert_eq!(
            codec.parse("not-a-token", TokenKind::Access),
            Err(TokenError::InvalidToken)
        );
        assert_eq!(codec.parse("", TokenKind::Refresh), Err(TokenError::InvalidToken));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let codec = codec();
        let signed = codec.sign(&uid("user-5"), "", TokenKind::Access).unwrap();
        let mut parts: Vec<&str> = signed.token.split('.').collect();
        let forged = codec.sign(&uid("attacker"), "", TokenKind::Access).unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");
        assert_eq!(
            codec.parse(&tampered, TokenKind::Access),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn tokens_of_the_other_kind_fail_on_the_key() {
        let codec = codec();
        let refresh = codec.sign(&uid("user-6"), "", TokenKind::Refresh).unwrap();
        assert_eq!(
            codec.parse(&refresh.token, TokenKind::Access),
            Err(TokenError::InvalidToken)
        );
        let access = codec.sign(&uid("user-6"), "", TokenKind::Access).unwrap();
        assert_eq!(
            codec.parse(&access.token, TokenKind::Refresh),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn kind_is_checked_even_when_the_key_matches() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let crafted = Claims {
            user_id: "user-7".into(),
            email: "".into(),
            token_kind: TokenKind::Refresh,
            iss: "tokenward.test".into(),
            sub: "user-7".into(),
            iat: now,
            nbf: now,
            exp: now + 600,
            jti: "crafted".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &crafted,
            &EncodingKey::from_secret(ACCESS_SECRET),
        )
        .unwrap();
        assert_eq!(
            codec.parse(&token, TokenKind::Access),
            Err(TokenError::InvalidTokenClaims)
        );
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let codec = codec();
        let other = JwtHs256Codec::new(JwtConfig {
            issuer: "someone.else".to_string(),
            lifetimes: TokenLifetimes::default(),
            secrets: TokenSecrets::new(ACCESS_SECRET, REFRESH_SECRET).unwrap(),
        });
        let signed = other.sign(&uid("user-8"), "", TokenKind::Access).unwrap();
        assert_eq!(
            codec.parse(&signed.token, TokenKind::Access),
            Err(TokenError::InvalidTokenClaims)
        );
    }

    #[test]
    fn secrets_must_be_distinct_and_present() {
        assert!(TokenSecrets::new("same", "same").is_err());
        assert!(TokenSecrets::new("", "x").is_err());
        assert!(TokenSecrets::new("a", "b").is_ok());
        assert_eq!(
            format!("{:?}", TokenSecrets::new("a", "b").unwrap()),
            "TokenSecrets { .. }"
        );
    }
}
