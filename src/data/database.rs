//! SQLite database operations
//!
//! All database access goes through this module.
//! Lookups return `Option` so callers decide whether a miss is fatal.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Escape LIKE wildcards in user input and wrap it for a substring match.
///
/// Pair with `ESCAPE '\'` in the query.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(sqlx::FromRow)]
struct SessionAdminRow {
    session_id: String,
    expires_at: DateTime<Utc>,
    admin_id: i64,
    github_id: i64,
    username: String,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Admins
    // =========================================================================

    /// Get an admin by primary key
    pub async fn get_admin(&self, id: i64) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(admin)
    }

    /// Get an admin by numeric GitHub user id
    pub async fn get_admin_by_github_id(&self, github_id: i64) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE github_id = ?")
            .bind(github_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(admin)
    }

    /// Create an admin for a GitHub identity
    ///
    /// Two concurrent first logins for the same GitHub id collapse into a
    /// single row; the later one only refreshes the username.
    pub async fn create_admin(&self, github_id: i64, username: &str) -> Result<Admin, AppError> {
        sqlx::query(
            r#"
            INSERT INTO admins (github_id, username) VALUES (?, ?)
            ON CONFLICT(github_id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(github_id)
        .bind(username)
        .execute(&self.pool)
        .await?;

        self.get_admin_by_github_id(github_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "admin with GitHub id {github_id} missing after insert"
                ))
            })
    }

    /// Update an admin's display username
    pub async fn update_admin_username(&self, id: i64, username: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE admins SET username = ? WHERE id = ?")
            .bind(username)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Count admin accounts
    pub async fn count_admins(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Auth sessions
    // =========================================================================

    /// Insert a login session
    ///
    /// # Errors
    /// Fails with a database error if `admin_id` does not reference an admin.
    pub async fn insert_auth_session(&self, session: &AuthSession) -> Result<(), AppError> {
        sqlx::query("INSERT INTO auth_sessions (id, admin_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(session.admin_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get a login session by id
    pub async fn get_auth_session(&self, id: &str) -> Result<Option<AuthSession>, AppError> {
        let session = sqlx::query_as::<_, AuthSession>("SELECT * FROM auth_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Get a login session together with the admin that owns it
    pub async fn get_auth_session_with_admin(
        &self,
        id: &str,
    ) -> Result<Option<(AuthSession, Admin)>, AppError> {
        let row = sqlx::query_as::<_, SessionAdminRow>(
            r#"
            SELECT s.id AS session_id, s.expires_at, a.id AS admin_id, a.github_id, a.username
            FROM auth_sessions s
            INNER JOIN admins a ON s.admin_id = a.id
            WHERE s.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            (
                AuthSession {
                    id: row.session_id,
                    admin_id: row.admin_id,
                    expires_at: row.expires_at,
                },
                Admin {
                    id: row.admin_id,
                    github_id: row.github_id,
                    username: row.username,
                },
            )
        }))
    }

    /// List the login sessions owned by an admin
    pub async fn get_auth_sessions_for_admin(
        &self,
        admin_id: i64,
    ) -> Result<Vec<AuthSession>, AppError> {
        let sessions = sqlx::query_as::<_, AuthSession>(
            "SELECT * FROM auth_sessions WHERE admin_id = ? ORDER BY expires_at",
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Move a login session's expiry
    pub async fn update_auth_session_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE auth_sessions SET expires_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a login session. Deleting a missing id is not an error.
    pub async fn delete_auth_session(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete every login session owned by an admin
    ///
    /// # Returns
    /// Number of sessions removed
    pub async fn delete_auth_sessions_for_admin(&self, admin_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE admin_id = ?")
            .bind(admin_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete login sessions whose expiry is at or before `now`
    ///
    /// # Returns
    /// Number of sessions removed
    pub async fn delete_expired_auth_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get all users
    pub async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Get users whose name contains `name`
    pub async fn get_users_like_name(&self, name: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE name LIKE ? ESCAPE '\' ORDER BY id"#,
        )
        .bind(contains_pattern(name))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Get a user by id
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Insert a user
    ///
    /// # Returns
    /// The new user's id
    pub async fn insert_user(&self, name: &str, age: Option<i64>) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO users (name, age) VALUES (?, ?)")
            .bind(name)
            .bind(age)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    // =========================================================================
    // Play sessions
    // =========================================================================

    /// Get a play session by id
    pub async fn get_play_session(&self, id: i64) -> Result<Option<PlaySession>, AppError> {
        let session = sqlx::query_as::<_, PlaySession>("SELECT * FROM play_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Get play sessions whose player name contains `username`
    pub async fn get_play_sessions_like_username(
        &self,
        username: &str,
    ) -> Result<Vec<PlaySessionWithUsername>, AppError> {
        let sessions = sqlx::query_as::<_, PlaySessionWithUsername>(
            r#"
            SELECT ps.id, ps.user_id, u.name AS username, ps.created_at
            FROM play_sessions ps
            INNER JOIN users u ON ps.user_id = u.id
            WHERE u.name LIKE ? ESCAPE '\'
            ORDER BY ps.id
            "#,
        )
        .bind(contains_pattern(username))
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Get play sessions whose id contains the digits of `id`
    pub async fn get_play_sessions_like_id(
        &self,
        id: i64,
    ) -> Result<Vec<PlaySessionWithUsername>, AppError> {
        let sessions = sqlx::query_as::<_, PlaySessionWithUsername>(
            r#"
            SELECT ps.id, ps.user_id, u.name AS username, ps.created_at
            FROM play_sessions ps
            INNER JOIN users u ON ps.user_id = u.id
            WHERE CAST(ps.id AS TEXT) LIKE ?
            ORDER BY ps.id
            "#,
        )
        .bind(format!("%{id}%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Get a user's play sessions with average score and attempt count
    pub async fn get_play_sessions_with_average_score(
        &self,
        user_id: i64,
    ) -> Result<Vec<PlaySessionWithAverageScore>, AppError> {
        let sessions = sqlx::query_as::<_, PlaySessionWithAverageScore>(
            r#"
            SELECT
                ps.id,
                ps.user_id,
                ps.created_at,
                AVG(sc.score) AS average_score,
                COUNT(sc.id) AS score_count
            FROM play_sessions ps
            LEFT JOIN scores sc ON sc.session_id = ps.id
            WHERE ps.user_id = ?
            GROUP BY ps.id, ps.user_id, ps.created_at
            ORDER BY ps.created_at DESC, ps.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Insert a play session
    ///
    /// # Returns
    /// The new play session's id
    pub async fn insert_play_session(
        &self,
        user_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO play_sessions (user_id, created_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    // =========================================================================
    // Levels and scores
    // =========================================================================

    /// Get all levels
    pub async fn get_levels(&self) -> Result<Vec<Level>, AppError> {
        let levels = sqlx::query_as::<_, Level>("SELECT * FROM levels ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(levels)
    }

    /// Insert a level
    ///
    /// # Returns
    /// The new level's id
    pub async fn insert_level(&self, name: &str) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO levels (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get the scores recorded in a play session
    pub async fn get_scores_by_session(&self, session_id: i64) -> Result<Vec<Score>, AppError> {
        let scores = sqlx::query_as::<_, Score>(
            "SELECT * FROM scores WHERE session_id = ? ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(scores)
    }

    /// Insert a score
    ///
    /// # Returns
    /// The new score's id
    pub async fn insert_score(&self, score: &NewScore) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scores (session_id, level_id, score, accuracy, time_taken, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(score.session_id)
        .bind(score.level_id)
        .bind(score.score)
        .bind(score.accuracy)
        .bind(score.time_taken)
        .bind(score.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get each player's best score, highest first
    ///
    /// A player whose best score was reached more than once appears once per
    /// matching attempt.
    pub async fn get_top_scores(&self, limit: i64) -> Result<Vec<TopScore>, AppError> {
        let scores = sqlx::query_as::<_, TopScore>(
            r#"
            WITH best AS (
                SELECT ps.user_id, MAX(sc.score) AS max_score
                FROM scores sc
                INNER JOIN play_sessions ps ON sc.session_id = ps.id
                GROUP BY ps.user_id
            )
            SELECT
                u.name,
                u.id AS user_id,
                sc.id AS score_id,
                sc.level_id,
                sc.session_id,
                sc.score,
                sc.accuracy,
                sc.time_taken,
                sc.created_at
            FROM users u
            INNER JOIN best b ON b.user_id = u.id
            INNER JOIN play_sessions ps ON ps.user_id = u.id
            INNER JOIN scores sc ON sc.session_id = ps.id AND sc.score = b.max_score
            ORDER BY sc.score DESC, sc.id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(scores)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Delete all game data and reset its id sequences
    ///
    /// Admins and login sessions are left untouched.
    pub async fn reset_game_data(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for table in ["scores", "play_sessions", "levels", "users"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        // sqlite_sequence only exists once an AUTOINCREMENT table has had a row
        let has_sequence_table = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
        )
        .fetch_one(&mut *tx)
        .await?
        .get::<i64, _>("n")
            > 0;

        if has_sequence_table {
            sqlx::query(
                "DELETE FROM sqlite_sequence WHERE name IN ('scores', 'play_sessions', 'levels', 'users')",
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
