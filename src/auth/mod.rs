//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow restricted to an allow-list
//! - Server-side sessions with rolling renewal
//! - Session cookies and middleware

pub mod cookie;
pub mod github;
mod middleware;
mod oauth;
pub mod session;
pub mod token;

pub use github::{GitHubClient, GitHubUser};
pub use middleware::{CurrentAdmin, MaybeAdmin, session_middleware};
pub use oauth::{LoginOutcome, auth_router, complete_github_login};
pub use session::{
    ValidatedSession, create_session, invalidate_all_sessions, invalidate_session,
    validate_session_token,
};
