//! Session middleware
//!
//! Resolves the `authSession` cookie on every request and keeps the cookie
//! in step with the stored session.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderValue, Request, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::cookie::{SESSION_COOKIE_NAME, removal_session_cookie, session_cookie, sets_cookie};
use super::session::{ValidatedSession, validate_session_token};
use crate::AppState;
use crate::error::AppError;

/// Middleware resolving the session cookie
///
/// - No cookie: the request proceeds anonymously and the response is untouched.
/// - Valid session: the `ValidatedSession` is placed in request extensions and
///   the cookie is re-issued with the (possibly renewed) expiry.
/// - Unknown, empty or expired session: the cookie is cleared.
///
/// A `Set-Cookie` for `authSession` written by the handler (login, logout)
/// takes precedence.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/dashboard", ...)
///     .layer(middleware::from_fn_with_state(state, session_middleware));
/// ```
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
    else {
        return next.run(request).await;
    };

    let secure = state.config.should_use_secure_cookies();

    let resolved = match validate_session_token(&state.db, &token).await {
        Ok(resolved) => resolved,
        Err(error) => return error.into_response(),
    };

    let cookie = match &resolved {
        Some(validated) => session_cookie(&token, validated.session.expires_at, secure),
        None => removal_session_cookie(secure),
    };

    if let Some(validated) = resolved {
        request.extensions_mut().insert(validated);
    }

    let mut response = next.run(request).await;

    if !sets_cookie(response.headers(), SESSION_COOKIE_NAME) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => tracing::error!(%error, "Failed to encode session cookie"),
        }
    }

    response
}

/// Extractor for the signed-in admin
///
/// Rejects with `401 Unauthorized` when the request carries no live session.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentAdmin(current): CurrentAdmin) -> impl IntoResponse {
///     format!("Hello, {}", current.admin.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub ValidatedSession);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ValidatedSession>()
            .cloned()
            .map(CurrentAdmin)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional admin extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeAdmin(pub Option<ValidatedSession>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAdmin(parts.extensions.get::<ValidatedSession>().cloned()))
    }
}
