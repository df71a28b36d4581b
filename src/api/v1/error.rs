use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<reject::PayloadTooLarge>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<reject::UnsupportedMediaType>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        )
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Malformed request")]
    BadRequest,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User already exists")]
    UserExists,
    #[error("User is not registered")]
    PermissionDenied,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("No valid session")]
    Unauthenticated,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn unavailable<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Dependency unavailable: {}", error);
        ApiErrorCode::ServiceUnavailable
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ApiErrorCode::UserExists => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::InvalidToken
            | TokenError::InvalidTokenClaims
            | TokenError::TokenNotFound
            | TokenError::TokenMismatch => ApiErrorCode::InvalidToken,
            TokenError::TokenExpired => ApiErrorCode::TokenExpired,
            TokenError::StoreUnavailable(e) => ApiErrorCode::unavailable(e),
            TokenError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Unauthenticated(_) => ApiErrorCode::Unauthenticated,
            SessionError::Internal(e) => ApiErrorCode::unavailable(e),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidArguments(_) => ApiErrorCode::BadRequest,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists | AuthError::Account(AccountError::AlreadyExists) => {
                ApiErrorCode::UserExists
            }
            AuthError::PermissionDenied => ApiErrorCode::PermissionDenied,
            AuthError::Account(AccountError::Unavailable(e)) => ApiErrorCode::unavailable(e),
            AuthError::Account(AccountError::Internal(e)) => ApiErrorCode::internal(e),
            AuthError::Token(e) => ApiErrorCode::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_outage_is_not_reported_as_a_bad_token() {
        assert_eq!(
            ApiErrorCode::from(TokenError::StoreUnavailable("down".into())),
            ApiErrorCode::ServiceUnavailable
        );
        assert_eq!(
            ApiErrorCode::from(TokenError::TokenNotFound),
            ApiErrorCode::InvalidToken
        );
    }

    #[test]
    fn auth_errors_keep_their_meaning() {
        assert_eq!(
            ApiErrorCode::from(AuthError::Token(TokenError::TokenExpired)),
            ApiErrorCode::TokenExpired
        );
        assert_eq!(
            ApiErrorCode::from(AuthError::Account(AccountError::AlreadyExists)),
            ApiErrorCode::UserExists
        );
        assert_eq!(
            ApiErrorCode::from(AuthError::InvalidArguments("email".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
