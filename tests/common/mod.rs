//! Common test utilities for E2E tests

use std::collections::HashSet;

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use gameportal::{AppState, auth, config, data};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Authorization code accepted by the mock GitHub for `github_id`/`login`
pub fn good_code(github_id: i64, login: &str) -> String {
    format!("good:{github_id}:{login}")
}

/// Authorization code the mock GitHub rejects with `bad_verification_code`
pub const BAD_CODE: &str = "bad";

/// Authorization code whose token is refused by the profile endpoint
pub const BROKEN_PROFILE_CODE: &str = "broken-profile";

/// Authorization code the mock GitHub answers after the client timeout
pub const SLOW_CODE: &str = "slow";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with an empty allow-list
    pub async fn new() -> Self {
        Self::with_allow_list(&[]).await
    }

    /// Create a test server whose allow-list holds `github_ids`
    pub async fn with_allow_list(github_ids: &[i64]) -> Self {
        gameportal::metrics::init_metrics();

        let github_addr = spawn(mock_github_router()).await;

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                allowed_github_ids: github_ids.iter().copied().collect::<HashSet<_>>(),
                session_cleanup_interval_seconds: 0,
                github: config::GitHubOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_uri: None,
                    authorize_url: format!("{github_addr}/login/oauth/authorize"),
                    token_url: format!("{github_addr}/login/oauth/access_token"),
                    api_base_url: github_addr.clone(),
                    timeout_seconds: 1,
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let addr = spawn(gameportal::build_router(state.clone())).await;

        Self {
            addr,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create an admin with a live session
    ///
    /// # Returns
    /// The admin and the raw session token for the `authSession` cookie
    pub async fn sign_in(&self, github_id: i64, username: &str) -> (data::Admin, String) {
        let admin = self
            .state
            .db
            .create_admin(github_id, username)
            .await
            .unwrap();
        let token = auth::token::generate_session_token();
        auth::create_session(&self.state.db, &token, admin.id)
            .await
            .unwrap();
        (admin, token)
    }

    /// Start a GitHub login and return the state stored in the cookie
    pub async fn begin_login(&self) -> String {
        let response = self
            .client
            .get(self.url("/login/github"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 302);

        set_cookie_value(response.headers(), auth::cookie::OAUTH_STATE_COOKIE_NAME)
            .expect("state cookie")
    }

    /// Hit the OAuth callback with a matching state cookie
    pub async fn callback(&self, code: &str) -> reqwest::Response {
        let state = self.begin_login().await;
        self.client
            .get(self.url("/login/github/callback"))
            .query(&[("code", code), ("state", state.as_str())])
            .header(
                header::COOKIE,
                format!("{}={state}", auth::cookie::OAUTH_STATE_COOKIE_NAME),
            )
            .send()
            .await
            .unwrap()
    }
}

/// `Cookie` header value carrying a session token
pub fn session_cookie_header(token: &str) -> String {
    format!("{}={token}", auth::cookie::SESSION_COOKIE_NAME)
}

/// Raw `Set-Cookie` header for `name`, if the response has one
pub fn set_cookie_header(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Value of the `Set-Cookie` for `name`, if the response has one
pub fn set_cookie_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    let raw = set_cookie_header(headers, name)?;
    let pair = raw.split(';').next()?;
    pair.split_once('=').map(|(_, value)| value.to_string())
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn spawn(app: Router) -> String {
    // Bind to random port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

// =============================================================================
// Mock GitHub
// =============================================================================

#[derive(Deserialize)]
struct TokenRequest {
    client_id: String,
    client_secret: String,
    code: String,
}

fn mock_github_router() -> Router {
    Router::new()
        .route("/login/oauth/access_token", post(mock_token))
        .route("/user", get(mock_user))
}

/// Token endpoint
///
/// `good:<id>:<login>` yields `token:<id>:<login>`; anything else is refused
/// the way GitHub does, with `200 OK` and an `error` field.
async fn mock_token(Form(request): Form<TokenRequest>) -> impl IntoResponse {
    if request.client_id != "test-client-id" || request.client_secret != "test-client-secret" {
        return Json(json!({ "error": "incorrect_client_credentials" }));
    }

    if request.code == SLOW_CODE {
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    }

    if request.code == BROKEN_PROFILE_CODE {
        return Json(json!({ "access_token": "revoked", "token_type": "bearer" }));
    }

    match request.code.strip_prefix("good:") {
        Some(identity) => Json(json!({
            "access_token": format!("token:{identity}"),
            "token_type": "bearer",
            "scope": "read:user",
        })),
        None => Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        })),
    }
}

/// Profile endpoint keyed by the bearer token
async fn mock_user(headers: HeaderMap) -> impl IntoResponse {
    let identity = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer token:"))
        .and_then(|identity| identity.split_once(':'))
        .and_then(|(id, login)| Some((id.parse::<i64>().ok()?, login.to_string())));

    match identity {
        Some((id, login)) => (StatusCode::OK, Json(json!({ "id": id, "login": login }))),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        ),
    }
}
