//! Data models
//!
//! Rust structs representing database rows.
//! Integer ids come from SQLite autoincrement; timestamps use chrono.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Administrators and login sessions
// =============================================================================

/// A portal administrator, created on first GitHub login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    /// Numeric GitHub user id
    pub github_id: i64,
    /// GitHub login
    pub username: String,
}

/// A login session
///
/// `id` is the SHA-256 hex digest of the cookie token, never the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthSession {
    pub id: String,
    pub admin_id: i64,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Game analytics
// =============================================================================

/// A player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
}

/// A game level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Level {
    pub id: i64,
    pub name: String,
}

/// One play-through by a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaySession {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Play session joined with its player's name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaySessionWithUsername {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Play session with aggregate score figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaySessionWithAverageScore {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    /// `None` when the session has no scored attempts
    pub average_score: Option<f64>,
    pub score_count: i64,
}

/// A level attempt within a play session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Score {
    pub id: i64,
    pub session_id: i64,
    pub level_id: i64,
    /// `None` when the attempt was abandoned
    pub score: Option<i64>,
    pub accuracy: f64,
    /// Seconds
    pub time_taken: f64,
    pub created_at: DateTime<Utc>,
}

/// A player's best score, as listed on the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopScore {
    pub name: String,
    pub user_id: i64,
    pub score_id: i64,
    pub level_id: i64,
    pub session_id: i64,
    pub score: Option<i64>,
    pub accuracy: f64,
    pub time_taken: f64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Score`]
#[derive(Debug, Clone)]
pub struct NewScore {
    pub session_id: i64,
    pub level_id: i64,
    pub score: Option<i64>,
    pub accuracy: f64,
    pub time_taken: f64,
    pub created_at: DateTime<Utc>,
}
