//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub, gated by
//! an allow-list of GitHub user ids for first-time logins.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::cookie::{
    OAUTH_STATE_COOKIE_NAME, oauth_state_cookie, removal_oauth_state_cookie,
    removal_session_cookie, session_cookie,
};
use super::middleware::MaybeAdmin;
use super::session::{create_session, invalidate_session};
use super::token::{constant_time_eq, generate_oauth_state, generate_session_token};
use crate::AppState;
use crate::data::{Admin, AuthSession};
use crate::error::AppError;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - GET /login/github - Redirect to GitHub
/// - GET /login/github/callback - OAuth callback
/// - POST /logout - Logout
/// - GET /unauthorized - Landing page for identities outside the allow-list
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/login/github", get(github_redirect))
        .route("/login/github/callback", get(github_callback))
        .route("/logout", post(logout))
        .route("/unauthorized", get(unauthorized_page))
}

/// 302 with a `Location` header
fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

// =============================================================================
// Login Page
// =============================================================================

/// GET /login
///
/// Renders a simple login page with GitHub sign-in button.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - GamePortal</title></head>
        <body>
            <h1>GamePortal</h1>
            <p>Please sign in with GitHub</p>
            <a href="/login/github">Sign in with GitHub</a>
        </body>
        </html>
    "#,
    )
}

/// GET /unauthorized
async fn unauthorized_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Html(
            r#"
        <!DOCTYPE html>
        <html>
        <head><title>Unauthorized - GamePortal</title></head>
        <body>
            <h1>Not authorized</h1>
            <p>This GitHub account is not allowed to administer GamePortal.</p>
        </body>
        </html>
    "#,
        ),
    )
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /login/github
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to GitHub with client_id, scope, state (and redirect_uri if fixed)
async fn github_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let oauth_state = generate_oauth_state();
    let url = state.github.authorization_url(&oauth_state)?;
    let secure = state.config.should_use_secure_cookies();

    let jar = jar.add(oauth_state_cookie(&oauth_state, secure));
    Ok((
        StatusCode::FOUND,
        jar,
        [(header::LOCATION, url.to_string())],
    ))
}

/// Query parameters from GitHub callback
///
/// Both are optional so a missing value yields a bare 400 instead of the
/// extractor's rejection body.
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
}

/// Result of a completed GitHub handshake
#[derive(Debug)]
pub enum LoginOutcome {
    /// A session was created; the token goes into the cookie
    SignedIn {
        token: String,
        session: AuthSession,
        admin: Admin,
    },
    /// Valid GitHub identity that is neither an admin nor allow-listed
    NotAllowListed { github_id: i64 },
}

/// GET /login/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch user info from GitHub
/// 4. Find or (if allow-listed) create the admin
/// 5. Create session and set cookie
/// 6. Redirect to home
async fn github_callback(
    State(state): State<AppState>,
    query: Result<Query<GitHubCallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let stored_state = jar
        .get(OAUTH_STATE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned());

    let verified = query
        .map_err(|rejection| {
            tracing::warn!(%rejection, "Unreadable OAuth callback query");
            AppError::MalformedRequest("unreadable callback query")
        })
        .and_then(|Query(query)| verify_callback(query, stored_state.as_deref()));

    let code = match verified {
        Ok(code) => code,
        Err(error) => {
            crate::metrics::record_login("rejected");
            return Err(error);
        }
    };

    let outcome = match complete_github_login(&state, &code).await {
        Ok(outcome) => outcome,
        Err(error) => {
            crate::metrics::record_login("failed");
            return Err(error);
        }
    };

    let secure = state.config.should_use_secure_cookies();
    match outcome {
        LoginOutcome::SignedIn { token, session, .. } => {
            crate::metrics::record_login("success");
            let jar = jar
                .add(session_cookie(&token, session.expires_at, secure))
                .add(removal_oauth_state_cookie(secure));
            Ok((jar, found("/")).into_response())
        }
        LoginOutcome::NotAllowListed { .. } => {
            crate::metrics::record_login("not_allow_listed");
            Ok(found("/unauthorized"))
        }
    }
}

/// Check the callback parameters against the stored state
///
/// # Returns
/// The authorization code
fn verify_callback(
    query: GitHubCallbackQuery,
    stored_state: Option<&str>,
) -> Result<String, AppError> {
    let (Some(code), Some(state), Some(stored_state)) = (query.code, query.state, stored_state)
    else {
        return Err(AppError::MalformedRequest("missing code, state or state cookie"));
    };

    if !constant_time_eq(&state, stored_state) {
        tracing::warn!("OAuth state mismatch");
        return Err(AppError::MalformedRequest("state mismatch"));
    }

    Ok(code)
}

/// Run the handshake after the state check
///
/// Exchanges the code, fetches the profile and maps it to an admin,
/// creating one only when the GitHub id is allow-listed.
pub async fn complete_github_login(
    state: &AppState,
    code: &str,
) -> Result<LoginOutcome, AppError> {
    let access_token = state.github.exchange_code(code).await?;
    let github_user = state.github.fetch_user(&access_token).await?;

    let admin = match state.db.get_admin_by_github_id(github_user.id).await? {
        Some(mut admin) => {
            if admin.username != github_user.login {
                state
                    .db
                    .update_admin_username(admin.id, &github_user.login)
                    .await?;
                admin.username = github_user.login.clone();
            }
            admin
        }
        None if state.config.auth.is_allow_listed(github_user.id) => {
            let admin = state
                .db
                .create_admin(github_user.id, &github_user.login)
                .await?;
            crate::metrics::ADMINS_CREATED_TOTAL.inc();
            tracing::info!(
                admin_id = admin.id,
                github_id = admin.github_id,
                username = %admin.username,
                "Admin account created"
            );
            admin
        }
        None => {
            tracing::warn!(
                github_id = github_user.id,
                login = %github_user.login,
                "GitHub user is not allow-listed"
            );
            return Ok(LoginOutcome::NotAllowListed {
                github_id: github_user.id,
            });
        }
    };

    let token = generate_session_token();
    let session = create_session(&state.db, &token, admin.id).await?;
    tracing::info!(admin_id = admin.id, username = %admin.username, "Admin signed in");

    Ok(LoginOutcome::SignedIn {
        token,
        session,
        admin,
    })
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Deletes the current session, clears the cookie and redirects to login.
async fn logout(
    State(state): State<AppState>,
    MaybeAdmin(current): MaybeAdmin,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(current) = current else {
        return Err(AppError::Unauthorized);
    };

    invalidate_session(&state.db, &current.session.id).await?;
    tracing::info!(admin_id = current.admin.id, "Admin signed out");

    let secure = state.config.should_use_secure_cookies();
    let jar = jar.add(removal_session_cookie(secure));
    Ok((jar, found("/login")).into_response())
}
