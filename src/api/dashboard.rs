//! Dashboard endpoints
//!
//! Read-only JSON views over the game analytics tables. Every route requires
//! a signed-in admin.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{CurrentAdmin, MaybeAdmin};
use crate::data::{
    PlaySession, PlaySessionWithAverageScore, PlaySessionWithUsername, Score, TopScore, User,
};
use crate::error::AppError;

/// Number of rows on the leaderboard
const TOP_SCORES_LIMIT: i64 = 10;

/// Create dashboard router
///
/// Routes:
/// - GET /dashboard - All users
/// - GET /dashboard/user?name= - Users by name
/// - GET /dashboard/user/:id - User with play sessions
/// - GET /dashboard/session?username=|id= - Play session search
/// - GET /dashboard/session/:id - Play session with user and scores
/// - GET /dashboard/scores/top - Leaderboard
pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(list_users))
        .route("/dashboard/user", get(search_users))
        .route("/dashboard/user/:id", get(get_user))
        .route("/dashboard/session", get(search_sessions))
        .route("/dashboard/session/:id", get(get_session))
        .route("/dashboard/scores/top", get(top_scores))
}

// =============================================================================
// Home
// =============================================================================

/// Response of `GET /`
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub logged_in: bool,
    pub username: Option<String>,
}

/// GET /
///
/// Public; reports whether the caller is signed in.
pub async fn home(MaybeAdmin(current): MaybeAdmin) -> Json<HomeResponse> {
    Json(HomeResponse {
        logged_in: current.is_some(),
        username: current.map(|current| current.admin.username),
    })
}

// =============================================================================
// Users
// =============================================================================

/// GET /dashboard
async fn list_users(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.db.get_all_users().await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
struct UserSearchParams {
    name: Option<String>,
}

/// GET /dashboard/user?name=
async fn search_users(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<Vec<User>>, AppError> {
    let Some(name) = params.name.filter(|name| !name.is_empty()) else {
        return Ok(Json(Vec::new()));
    };

    let users = state.db.get_users_like_name(&name).await?;
    Ok(Json(users))
}

/// Response of `GET /dashboard/user/:id`
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub user: User,
    pub sessions: Vec<PlaySessionWithAverageScore>,
}

/// GET /dashboard/user/:id
async fn get_user(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
    Path(id): Path<i64>,
) -> Result<Json<UserDetail>, AppError> {
    let user = state.db.get_user(id).await?.ok_or(AppError::NotFound)?;
    let sessions = state.db.get_play_sessions_with_average_score(user.id).await?;

    Ok(Json(UserDetail { user, sessions }))
}

// =============================================================================
// Play sessions
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionSearchParams {
    username: Option<String>,
    id: Option<String>,
}

/// GET /dashboard/session?username=|id=
///
/// `username` wins when both are given. `id` is read up to its first
/// non-digit (`12abc` searches for `12`); a missing, zero or non-numeric
/// `id` matches nothing.
async fn search_sessions(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
    Query(params): Query<SessionSearchParams>,
) -> Result<Json<Vec<PlaySessionWithUsername>>, AppError> {
    if let Some(username) = params.username.filter(|username| !username.is_empty()) {
        let sessions = state.db.get_play_sessions_like_username(&username).await?;
        return Ok(Json(sessions));
    }

    match params.id.as_deref().and_then(parse_id_prefix) {
        Some(id) => Ok(Json(state.db.get_play_sessions_like_id(id).await?)),
        None => Ok(Json(Vec::new())),
    }
}

/// Leading decimal digits of `raw` as a non-zero id
fn parse_id_prefix(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let digits = raw
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw, |end| &raw[..end]);

    digits.parse::<i64>().ok().filter(|id| *id != 0)
}

/// Response of `GET /dashboard/session/:id`
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: PlaySession,
    pub user: User,
    pub scores: Vec<Score>,
}

/// GET /dashboard/session/:id
async fn get_session(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
    Path(id): Path<i64>,
) -> Result<Json<SessionDetail>, AppError> {
    let session = state
        .db
        .get_play_session(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let user = state
        .db
        .get_user(session.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let scores = state.db.get_scores_by_session(session.id).await?;

    Ok(Json(SessionDetail {
        session,
        user,
        scores,
    }))
}

// =============================================================================
// Scores
// =============================================================================

/// GET /dashboard/scores/top
async fn top_scores(
    State(state): State<AppState>,
    CurrentAdmin(_current): CurrentAdmin,
) -> Result<Json<Vec<TopScore>>, AppError> {
    let scores = state.db.get_top_scores(TOP_SCORES_LIMIT).await?;
    Ok(Json(scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_prefix_reads_leading_digits() {
        assert_eq!(parse_id_prefix("12"), Some(12));
        assert_eq!(parse_id_prefix(" 12abc"), Some(12));
        assert_eq!(parse_id_prefix("007"), Some(7));
    }

    #[test]
    fn id_prefix_rejects_zero_and_non_numbers() {
        assert_eq!(parse_id_prefix("0"), None);
        assert_eq!(parse_id_prefix("00x"), None);
        assert_eq!(parse_id_prefix(""), None);
        assert_eq!(parse_id_prefix("abc"), None);
        assert_eq!(parse_id_prefix("-3"), None);
    }
}
