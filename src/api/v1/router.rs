use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::RequestIdentity;
use crate::server::*;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

/// Optional companion to `Authorization: Bearer`, carrying the refresh token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with(server.token_store.clone()))
        .and_then(handler::health);

    let generate_token = warp::path!("token" / "generate")
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::generate_token);

    let validate_token = warp::path!("token" / "validate")
        .and(warp::post())
        .and(json_body())
        .and(with(server.token_authority.clone()))
        .and_then(handler::validate_token);

    let refresh_token = warp::path!("token" / "refresh")
        .and(warp::post())
        .and(json_body())
        .and(with(server.token_authority.clone()))
        .and_then(handler::refresh_token);

    let revoke_tokens = warp::path!("token" / "revoke")
        .and(warp::post())
        .and(json_body())
        .and(with(server.token_authority.clone()))
        .and_then(handler::revoke_tokens);

    let validate_session = warp::path!("session" / "validate")
        .and(warp::post())
        .and(json_body())
        .and(with(server.session_validator.clone()))
        .and_then(handler::validate_session);

    let signup = warp::path("signup")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_identity(server.session_validator.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let session = warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(server.session_validator.clone()))
        .and_then(handler::current_session);

    health
        .or(generate_token)
        .or(validate_token)
        .or(refresh_token)
        .or(revoke_tokens)
        .or(validate_session)
        .or(signup)
        .or(login)
        .or(logout)
        .or(session)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Resolves the caller's session from `Authorization: Bearer <access>` and
/// the optional refresh token header.
fn with_session(
    session_validator: Arc<dyn SessionValidator>,
) -> impl Filter<Extract = (ValidatedSession,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref())
        .and(warp::header::optional::<String>(REFRESH_TOKEN_HEADER))
        .and_then(
            move |authorization: Option<String>, refresh_token: Option<String>| {
                let session_validator = session_validator.clone();
                async move {
                    let access_token = match authorization.as_deref() {
                        None => "",
                        Some(value) => value
                            .strip_prefix("Bearer ")
                            .ok_or_else(|| reject::custom(ApiErrorCode::InvalidToken))?,
                    };
                    let session = session_validator
                        .validate_session(access_token, refresh_token.as_deref().unwrap_or(""))
                        .await
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom)?;
                    Ok::<_, warp::Rejection>(session)
                }
            },
        )
}

fn with_identity(
    session_validator: Arc<dyn SessionValidator>,
) -> impl Filter<Extract = (RequestIdentity,), Error = warp::Rejection> + Clone {
    with_session(session_validator).map(|session: ValidatedSession| session.identity)
}
