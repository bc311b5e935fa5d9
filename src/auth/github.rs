//! GitHub OAuth client
//!
//! Code exchange and profile lookup. Every call is bounded by the configured
//! timeout and attempted once; an authorization code cannot be replayed.

use std::time::Duration;

use serde::Deserialize;

use crate::config::GitHubOAuthConfig;
use crate::error::{AppError, Result};

/// Scope requested on the authorization redirect
pub const GITHUB_SCOPE: &str = "read:user";

/// GitHub token endpoint response
///
/// GitHub answers `200 OK` with an `error` field when the code is rejected.
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GitHub user info
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    /// Numeric user id
    pub id: i64,
    /// Login name
    pub login: String,
}

/// Thin client over the GitHub OAuth and REST endpoints
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubOAuthConfig,
}

impl GitHubClient {
    /// Build a client with the configured timeout
    pub fn new(config: GitHubOAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("GamePortal/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self { http, config })
    }

    /// Build the URL that sends the browser to GitHub's consent screen
    pub fn authorization_url(&self, state: &str) -> Result<url::Url> {
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("state", state),
            ("scope", GITHUB_SCOPE),
        ];
        if let Some(redirect_uri) = self.config.redirect_uri.as_deref() {
            params.push(("redirect_uri", redirect_uri));
        }

        url::Url::parse_with_params(&self.config.authorize_url, &params)
            .map_err(|e| AppError::Config(format!("invalid GitHub authorize URL: {e}")))
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// `UpstreamAuth` if GitHub rejects the code or credentials, or the call
    /// fails or times out.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
        ];
        if let Some(redirect_uri) = self.config.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| upstream("token exchange request failed", e))?
            .error_for_status()
            .map_err(|e| upstream("token exchange rejected", e))?;

        let body: GitHubTokenResponse = response
            .json()
            .await
            .map_err(|e| upstream("token exchange returned an unreadable body", e))?;

        match (body.access_token, body.error) {
            (Some(token), None) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(AppError::UpstreamAuth(format!(
                "{error}: {}",
                body.error_description.unwrap_or_default()
            ))),
            _ => Err(AppError::UpstreamAuth(
                "token exchange returned no access token".to_string(),
            )),
        }
    }

    /// Fetch the profile of the user owning `access_token`
    pub async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser> {
        let url = format!("{}/user", self.config.api_base_url.trim_end_matches('/'));

        let user = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| upstream("profile request failed", e))?
            .error_for_status()
            .map_err(|e| upstream("profile request rejected", e))?
            .json::<GitHubUser>()
            .await
            .map_err(|e| upstream("profile response unreadable", e))?;

        Ok(user)
    }
}

fn upstream(context: &str, error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        tracing::warn!(%error, "{context}: GitHub timed out");
    } else {
        tracing::warn!(%error, "{context}");
    }
    AppError::UpstreamAuth(format!("{context}: {error}"))
}
