use crate::db::errors::DbError;
use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    db::handlers::{Repository, Users},
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

fn deactivated() -> Error {
    Error::Unauthenticated {
        message: Some("User account is deactivated".to_string()),
    }
}

/// Pull the session token out of the cookie header.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(token)): Cookie found
/// - Some(Err(error)): Cookie header present but not valid UTF-8
fn session_cookie<'a>(parts: &'a Parts, cookie_name: &str) -> Option<Result<&'a str>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };

    cookie_str
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| Ok(value))
}

/// Extract user from JWT session cookie if present and valid.
///
/// The token only proves who the caller was at login; the account is re-read so role changes
/// and deactivations apply immediately.
#[instrument(skip(parts, state))]
async fn try_jwt_session_auth(parts: &Parts, state: &AppState) -> Option<Result<CurrentUser>> {
    let token = match session_cookie(parts, &state.config.auth.native.session.cookie_name)? {
        Ok(token) => token,
        Err(e) => return Some(Err(e)),
    };

    let claims = match session::verify_session_token(token, &state.config) {
        Ok(claims) => claims,
        Err(e) => return Some(Err(e)),
    };

    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    Some(match Users::new(&mut conn).get_by_id(claims.id).await {
        Ok(Some(user)) if user.is_active => Ok(CurrentUser::from(&user)),
        Ok(Some(_)) => Err(deactivated()),
        Ok(None) => Err(Error::Unauthenticated { message: None }),
        Err(e) => Err(Error::Database(e)),
    })
}

/// Extract user from the trusted proxy header if present.
/// Returns:
/// - None: No proxy header present
/// - Some(Ok(user)): Header names an active user
/// - Some(Err(error)): Header present but the user is unknown, inactive, or the lookup failed
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(parts: &Parts, config: &crate::config::Config, db: &PgPool) -> Option<Result<CurrentUser>> {
    let username = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())?;

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    Some(match Users::new(&mut conn).get_by_username(username).await {
        Ok(Some(user)) if user.is_active => Ok(CurrentUser::from(&user)),
        Ok(Some(_)) => Err(deactivated()),
        Ok(None) => Err(Error::Unauthenticated { message: None }),
        Err(e) => Err(Error::Database(e)),
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but rejected
        let mut auth_errors = Vec::new();

        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, state).await {
                Some(Ok(user)) => {
                    debug!("Found JWT session authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("JWT session authentication failed: {:?}", e);
                    auth_errors.push(("JWT session", e));
                }
                None => {
                    trace!("No JWT session authentication attempted");
                }
            }
        }

        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("Proxy header authentication failed: {:?}", e);
                    auth_errors.push(("Proxy header", e));
                }
                None => {
                    trace!("No proxy header authentication attempted");
                }
            }
        }

        if auth_errors.is_empty() {
            trace!("No authentication credentials found in request");
            return Err(Error::Unauthenticated { message: None });
        }

        trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        // Surface a deactivated account message, hide everything else
        let deactivated = auth_errors
            .into_iter()
            .map(|(_, e)| e)
            .find(|e| matches!(e, Error::Unauthenticated { message: Some(_) }));
        Err(deactivated.unwrap_or(Error::Unauthenticated { message: None }))
    }
}

/// `Option<CurrentUser>`: `None` for anonymous or rejected callers, for endpoints that work either way.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        Ok(<CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await.ok())
    }
}
