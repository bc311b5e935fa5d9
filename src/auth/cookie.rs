//! Cookies carrying the session token and the OAuth state

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::{Duration as CookieDuration, OffsetDateTime};

/// Cookie holding the raw session token
pub const SESSION_COOKIE_NAME: &str = "authSession";

/// Cookie holding the anti-forgery state during the GitHub redirect
pub const OAUTH_STATE_COOKIE_NAME: &str = "github_oauth_state";

/// How long the OAuth state survives, in seconds
const OAUTH_STATE_MAX_AGE_SECONDS: i64 = 60 * 10;

/// Build the session cookie, expiring together with the session record.
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let expires = time_from_chrono(expires_at);

    Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .expires(expires)
        .build()
}

/// Build a cookie that immediately expires the session cookie.
pub fn removal_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .build()
}

/// Build the short-lived OAuth state cookie.
pub fn oauth_state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE_NAME, state.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(OAUTH_STATE_MAX_AGE_SECONDS))
        .build()
}

/// Build a cookie that immediately expires the OAuth state cookie.
pub fn removal_oauth_state_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .build()
}

/// Whether a response already carries a `Set-Cookie` for `name`.
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok())
        .any(|cookie| cookie.name() == name)
}

fn time_from_chrono(at: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
