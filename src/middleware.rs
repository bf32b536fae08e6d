use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tower_http::{
    compression::CompressionLayer, timeout::RequestBodyTimeoutLayer, trace::TraceLayer,
};
use tracing::debug;

use crate::{
    auth::{SESSION_COOKIE, SessionUser},
    error::AppError,
    state::AppState,
};

pub fn apply_axum_middleware(router: Router) -> Router {
    router
        .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(10)))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Resolve the session cookie of every request.
///
/// A valid token puts a [`SessionUser`] into the request extensions; a
/// missing or invalid one leaves the request anonymous.
pub async fn set_user_status(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.sessions.verify(cookie.value()) {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(err) => debug!("Ignoring invalid session token: {err}"),
        }
    }
    next.run(request).await
}

/// Only let logged-in users through
pub async fn ensure_logged_in(request: Request, next: Next) -> Response {
    if request.extensions().get::<SessionUser>().is_none() {
        return AppError::Unauthorized("You need to be logged in".to_string()).into_response();
    }
    next.run(request).await
}

/// Only let anonymous users through
pub async fn ensure_not_logged_in(request: Request, next: Next) -> Response {
    if request.extensions().get::<SessionUser>().is_some() {
        return AppError::Unauthorized("You are already logged in".to_string()).into_response();
    }
    next.run(request).await
}

/// The session user if there is one, for routes open to everybody
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<SessionUser>().cloned()))
    }
}
