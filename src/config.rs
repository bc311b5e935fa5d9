//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::{Deserialize, Deserializer};
use std::{collections::HashSet, net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "admin.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the portal
    ///
    /// # Returns
    /// Full URL like "https://admin.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (GitHub OAuth)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// GitHub numeric user ids allowed to create an admin account on first login.
    ///
    /// Accepts either a comma-separated string (`"123,456"`) or a list of integers.
    #[serde(default, deserialize_with = "deserialize_github_ids")]
    pub allowed_github_ids: HashSet<i64>,
    /// Interval for purging expired sessions, in seconds (0 disables the task)
    pub session_cleanup_interval_seconds: u64,
    pub github: GitHubOAuthConfig,
}

impl AuthConfig {
    pub fn is_allow_listed(&self, github_id: i64) -> bool {
        self.allowed_github_ids.contains(&github_id)
    }
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Fixed callback URL. When unset, GitHub uses the one registered with the OAuth app.
    pub redirect_uri: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL of the REST API (profile lookups hit `{api_base_url}/user`)
    pub api_base_url: String,
    /// Upper bound for each call to GitHub, in seconds
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` still takes precedence
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim().to_ascii_lowercase();
        format!("gameportal={level},tower_http={level}")
    }

    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GAMEPORTAL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        let app_config = Self::load_unvalidated()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Load configuration without checking the GitHub OAuth settings
    ///
    /// For tooling that only needs the database (e.g. `reseed`).
    pub fn load_unvalidated() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/gameportal.db")?
            .set_default("auth.allowed_github_ids", "")?
            .set_default("auth.session_cleanup_interval_seconds", 3600)?
            .set_default("auth.github.authorize_url", GITHUB_AUTHORIZE_URL)?
            .set_default("auth.github.token_url", GITHUB_TOKEN_URL)?
            .set_default("auth.github.api_base_url", GITHUB_API_BASE_URL)?
            .set_default("auth.github.timeout_seconds", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // GAMEPORTAL__AUTH__GITHUB__CLIENT_ID etc.
            .add_source(
                Environment::with_prefix("GAMEPORTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        let github = &self.auth.github;

        if github.client_id.trim().is_empty() || github.client_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.github.client_id and auth.github.client_secret must be set".to_string(),
            ));
        }

        if github.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "auth.github.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("auth.github.authorize_url", &github.authorize_url),
            ("auth.github.token_url", &github.token_url),
            ("auth.github.api_base_url", &github.api_base_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                crate::error::AppError::Config(format!("{key} is not a valid URL: {e}"))
            })?;
        }

        if self.auth.allowed_github_ids.is_empty() {
            tracing::warn!("auth.allowed_github_ids is empty; only existing admins can sign in");
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// Parse a comma-separated GitHub id allow-list such as `"1,2,3"`.
pub fn parse_github_id_list(raw: &str) -> Result<HashSet<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| format!("invalid GitHub user id in allow-list: {part:?}"))
        })
        .collect()
}

fn deserialize_github_ids<'de, D>(deserializer: D) -> Result<HashSet<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIds {
        List(Vec<i64>),
        Single(i64),
        Text(String),
    }

    match RawIds::deserialize(deserializer)? {
        RawIds::List(ids) => Ok(ids.into_iter().collect()),
        RawIds::Single(id) => Ok(HashSet::from([id])),
        RawIds::Text(raw) => parse_github_id_list(&raw).map_err(serde::de::Error::custom),
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    // Url::host_str keeps the brackets around IPv6 literals
    if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
