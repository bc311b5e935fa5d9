//! E2E tests for the session middleware

mod common;

use chrono::{Duration, Utc};
use common::{TestServer, session_cookie_header, set_cookie_header, set_cookie_value};
use gameportal::auth::{cookie::SESSION_COOKIE_NAME, token::hash_session_token};

async fn home(server: &TestServer, token: Option<&str>) -> reqwest::Response {
    let mut request = server.client.get(server.url("/"));
    if let Some(token) = token {
        request = request.header(reqwest::header::COOKIE, session_cookie_header(token));
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_anonymous_request_leaves_cookies_alone() {
    let server = TestServer::new().await;

    let response = home(&server, None).await;

    assert_eq!(response.status(), 200);
    assert!(set_cookie_header(response.headers(), SESSION_COOKIE_NAME).is_none());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["logged_in"], false);
    assert!(body["username"].is_null());
}

#[tokio::test]
async fn test_valid_session_is_resolved_and_cookie_reissued() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(5005, "player-one").await;

    let response = home(&server, Some(&token)).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        set_cookie_value(response.headers(), SESSION_COOKIE_NAME).as_deref(),
        Some(token.as_str())
    );
    let raw = set_cookie_header(response.headers(), SESSION_COOKIE_NAME).unwrap();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("Expires="));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["logged_in"], true);
    assert_eq!(body["username"], "player-one");
}

#[tokio::test]
async fn test_unknown_session_cookie_is_cleared() {
    let server = TestServer::new().await;

    let response = home(&server, Some("not-a-real-token")).await;

    assert_eq!(response.status(), 200);
    let cleared = set_cookie_header(response.headers(), SESSION_COOKIE_NAME).unwrap();
    assert!(cleared.starts_with(&format!("{SESSION_COOKIE_NAME}=;")));
    assert!(cleared.contains("Max-Age=0"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["logged_in"], false);
}

#[tokio::test]
async fn test_empty_session_cookie_is_cleared() {
    let server = TestServer::new().await;

    let response = home(&server, Some("")).await;

    assert_eq!(response.status(), 200);
    let cleared = set_cookie_header(response.headers(), SESSION_COOKIE_NAME).unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["logged_in"], false);
}

#[tokio::test]
async fn test_expired_session_is_deleted_and_cookie_cleared() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(5006, "lapsed").await;
    let session_id = hash_session_token(&token);
    server
        .state
        .db
        .update_auth_session_expiry(&session_id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    let response = home(&server, Some(&token)).await;

    let cleared = set_cookie_header(response.headers(), SESSION_COOKIE_NAME).unwrap();
    assert!(cleared.contains("Max-Age=0"));
    assert!(
        server
            .state
            .db
            .get_auth_session(&session_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_session_near_expiry_is_renewed_on_request() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(5007, "regular").await;
    let session_id = hash_session_token(&token);
    let near_expiry = Utc::now() + Duration::days(3);
    server
        .state
        .db
        .update_auth_session_expiry(&session_id, near_expiry)
        .await
        .unwrap();

    let response = home(&server, Some(&token)).await;
    assert_eq!(response.status(), 200);

    let stored = server
        .state
        .db
        .get_auth_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.expires_at > Utc::now() + Duration::days(29));
}
