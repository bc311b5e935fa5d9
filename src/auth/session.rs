//! Session management
//!
//! Server-side sessions keyed by the hash of the cookie token, with a
//! 30-day lifetime that slides forward once fewer than 15 days remain.

use chrono::{DateTime, Duration, Utc};

use super::token::hash_session_token;
use crate::data::{Admin, AuthSession, Database};
use crate::error::AppError;

/// Lifetime of a new or renewed session, in days
pub const SESSION_LIFETIME_DAYS: i64 = 30;

/// Remaining lifetime below which a session is renewed, in days
pub const SESSION_RENEWAL_THRESHOLD_DAYS: i64 = 15;

fn session_lifetime() -> Duration {
    Duration::days(SESSION_LIFETIME_DAYS)
}

/// A live session together with the admin that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    pub session: AuthSession,
    pub admin: Admin,
}

/// Create a session for `admin_id` from a freshly generated token
///
/// # Errors
/// Returns a database error if `admin_id` does not reference an admin.
pub async fn create_session(
    db: &Database,
    token: &str,
    admin_id: i64,
) -> Result<AuthSession, AppError> {
    let session = AuthSession {
        id: hash_session_token(token),
        admin_id,
        expires_at: Utc::now() + session_lifetime(),
    };
    db.insert_auth_session(&session).await?;

    tracing::debug!(admin_id, expires_at = %session.expires_at, "Session created");
    Ok(session)
}

/// Resolve a presented token to a live session
///
/// # Returns
/// - `None` if no session matches, or the session has expired (the row is deleted)
/// - the session with a renewed expiry if fewer than 15 days remained
/// - the session unchanged otherwise
pub async fn validate_session_token(
    db: &Database,
    token: &str,
) -> Result<Option<ValidatedSession>, AppError> {
    let session_id = hash_session_token(token);

    let Some((mut session, admin)) = db.get_auth_session_with_admin(&session_id).await? else {
        crate::metrics::record_session_validation("not_found");
        return Ok(None);
    };

    let now = Utc::now();

    if is_expired(&session, now) {
        db.delete_auth_session(&session.id).await?;
        crate::metrics::record_session_validation("expired");
        tracing::debug!(admin_id = admin.id, "Expired session removed");
        return Ok(None);
    }

    if needs_renewal(&session, now) {
        session.expires_at = now + session_lifetime();
        db.update_auth_session_expiry(&session.id, session.expires_at)
            .await?;
        crate::metrics::record_session_validation("renewed");
        tracing::debug!(admin_id = admin.id, expires_at = %session.expires_at, "Session renewed");
    } else {
        crate::metrics::record_session_validation("valid");
    }

    Ok(Some(ValidatedSession { session, admin }))
}

/// Delete a single session (logout). Missing ids are ignored.
pub async fn invalidate_session(db: &Database, session_id: &str) -> Result<(), AppError> {
    db.delete_auth_session(session_id).await
}

/// Delete every session of an admin (log out everywhere)
pub async fn invalidate_all_sessions(db: &Database, admin_id: i64) -> Result<(), AppError> {
    let removed = db.delete_auth_sessions_for_admin(admin_id).await?;
    tracing::info!(admin_id, removed, "All sessions invalidated");
    Ok(())
}

fn is_expired(session: &AuthSession, now: DateTime<Utc>) -> bool {
    now >= session.expires_at
}

fn needs_renewal(session: &AuthSession, now: DateTime<Utc>) -> bool {
    session.expires_at - now < Duration::days(SESSION_RENEWAL_THRESHOLD_DAYS)
}
