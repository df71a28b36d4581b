use super::error::*;
use crate::application_port::*;
use crate::domain_model::{RequestIdentity, TokenPair, UserId};
use crate::domain_port::TokenStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    store: &'static str,
}

pub async fn health(
    token_store: Arc<dyn TokenStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    token_store
        .ping()
        .await
        .map_err(ApiErrorCode::unavailable)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(HealthResponse { store: "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateTokenRequest {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

pub async fn generate_token(
    body: GenerateTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .generate_token(&body.user_id, &body.email)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub status: TokenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Always answers with a status; a bad token is an outcome here, not an error.
pub async fn validate_token(
    body: ValidateTokenRequest,
    token_authority: Arc<dyn TokenAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match token_authority
        .validate_access_token(&body.access_token)
        .await
    {
        Ok(user_id) => ValidateTokenResponse {
            status: TokenStatus::Valid,
            user_id: Some(user_id),
        },
        Err(e) => ValidateTokenResponse {
            status: TokenStatus::from_error(&e),
            user_id: None,
        },
    };

    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    body: RefreshTokenRequest,
    token_authority: Arc<dyn TokenAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = token_authority
        .validate_refresh_token(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateSessionRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateSessionResponse {
    pub status: TokenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_pair: Option<TokenPair>,
    pub refreshed: bool,
}

pub async fn validate_session(
    body: ValidateSessionRequest,
    session_validator: Arc<dyn SessionValidator>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match session_validator
        .validate_session(&body.access_token, &body.refresh_token)
        .await
    {
        Ok(session) => ValidateSessionResponse {
            status: TokenStatus::Valid,
            user_id: Some(session.identity.user_id),
            token_pair: Some(session.tokens),
            refreshed: session.refreshed,
        },
        Err(SessionError::Unauthenticated(rejection)) => ValidateSessionResponse {
            status: rejection.status(),
            user_id: None,
            token_pair: None,
            refreshed: false,
        },
        Err(e) => return Err(reject::custom(ApiErrorCode::from(e))),
    };

    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn revoke_tokens(
    body: RevokeTokenRequest,
    token_authority: Arc<dyn TokenAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = UserId::parse(body.user_id)
        .map_err(|_| reject::custom(ApiErrorCode::BadRequest))?;
    token_authority
        .revoke_tokens(&user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(SuccessResponse {
        success: true,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

pub async fn signup(
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        name: body.name,
        email: body.email,
        password: body.password,
        address: body.address,
    };
    let result = auth_service
        .signup(signup_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(result)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(result)))
}

pub async fn logout(
    identity: RequestIdentity,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(&identity)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(SuccessResponse {
        success: true,
    })))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub refreshed: bool,
    /// Present only when the session was upgraded; the client must store it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_pair: Option<TokenPair>,
}

pub async fn current_session(
    session: ValidatedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = SessionResponse {
        user_id: session.identity.user_id,
        refreshed: session.refreshed,
        token_pair: session.refreshed.then_some(session.tokens),
    };

    Ok(warp::reply::json(&ApiResponse::ok(response)))
}
