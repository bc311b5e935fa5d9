//! E2E tests for the dashboard endpoints

mod common;

use chrono::Utc;
use common::{TestServer, session_cookie_header};
use gameportal::data::NewScore;

/// Two players with one play session each
///
/// # Returns
/// (alice id, bob id, alice's play session id)
async fn seed(server: &TestServer) -> (i64, i64, i64) {
    let db = &server.state.db;
    let level = db.insert_level("Tutorial").await.unwrap();
    let alice = db.insert_user("Alice", Some(30)).await.unwrap();
    let bob = db.insert_user("Bob_99", Some(41)).await.unwrap();

    let alice_session = db.insert_play_session(alice, Utc::now()).await.unwrap();
    let bob_session = db.insert_play_session(bob, Utc::now()).await.unwrap();

    for (session_id, score) in [(alice_session, 80), (alice_session, 100), (bob_session, 60)] {
        db.insert_score(&NewScore {
            session_id,
            level_id: level,
            score: Some(score),
            accuracy: 0.9,
            time_taken: 42.0,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }

    (alice, bob, alice_session)
}

async fn get_json(server: &TestServer, token: &str, path: &str) -> serde_json::Value {
    let response = server
        .client
        .get(server.url(path))
        .header(reqwest::header::COOKIE, session_cookie_header(token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "GET {path}");
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let server = TestServer::new().await;
    seed(&server).await;

    for path in [
        "/dashboard",
        "/dashboard/user?name=Al",
        "/dashboard/user/1",
        "/dashboard/session?username=Al",
        "/dashboard/session/1",
        "/dashboard/scores/top",
    ] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 401, "GET {path}");
    }
}

#[tokio::test]
async fn test_dashboard_lists_users() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    seed(&server).await;

    let users = get_json(&server, &token, "/dashboard").await;
    let names: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Alice", "Bob_99"]);
}

#[tokio::test]
async fn test_user_search_escapes_wildcards() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    seed(&server).await;

    let matches = get_json(&server, &token, "/dashboard/user?name=b_9").await;
    assert_eq!(matches.as_array().unwrap().len(), 1);

    let matches = get_json(&server, &token, "/dashboard/user?name=%25").await;
    assert!(matches.as_array().unwrap().is_empty());

    let matches = get_json(&server, &token, "/dashboard/user").await;
    assert!(matches.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_detail_includes_session_averages() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    let (alice, _bob, alice_session) = seed(&server).await;

    let detail = get_json(&server, &token, &format!("/dashboard/user/{alice}")).await;
    assert_eq!(detail["user"]["name"], "Alice");
    let sessions = detail["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], alice_session);
    assert_eq!(sessions[0]["average_score"], 90.0);
    assert_eq!(sessions[0]["score_count"], 2);
}

#[tokio::test]
async fn test_session_search_by_username_and_id() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    let (_alice, bob, _alice_session) = seed(&server).await;

    let by_name = get_json(&server, &token, "/dashboard/session?username=bob").await;
    let by_name = by_name.as_array().unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0]["user_id"], bob);
    assert_eq!(by_name[0]["username"], "Bob_99");

    let by_id = get_json(&server, &token, "/dashboard/session?id=2").await;
    assert_eq!(by_id.as_array().unwrap().len(), 1);

    let by_prefix = get_json(&server, &token, "/dashboard/session?id=2abc").await;
    assert_eq!(by_prefix.as_array().unwrap().len(), 1);

    let nothing = get_json(&server, &token, "/dashboard/session?id=0").await;
    assert!(nothing.as_array().unwrap().is_empty());

    let nothing = get_json(&server, &token, "/dashboard/session?id=abc").await;
    assert!(nothing.as_array().unwrap().is_empty());

    let nothing = get_json(&server, &token, "/dashboard/session").await;
    assert!(nothing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_detail_includes_user_and_scores() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    let (alice, _bob, alice_session) = seed(&server).await;

    let detail = get_json(&server, &token, &format!("/dashboard/session/{alice_session}")).await;
    assert_eq!(detail["session"]["id"], alice_session);
    assert_eq!(detail["user"]["id"], alice);
    assert_eq!(detail["scores"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;

    for path in ["/dashboard/user/999", "/dashboard/session/999"] {
        let response = server
            .client
            .get(server.url(path))
            .header(reqwest::header::COOKIE, session_cookie_header(&token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "GET {path}");
    }
}

#[tokio::test]
async fn test_top_scores_lists_best_per_user() {
    let server = TestServer::new().await;
    let (_admin, token) = server.sign_in(1, "admin").await;
    seed(&server).await;

    let top = get_json(&server, &token, "/dashboard/scores/top").await;
    let top = top.as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["name"], "Alice");
    assert_eq!(top[0]["score"], 100);
    assert_eq!(top[1]["name"], "Bob_99");
    assert_eq!(top[1]["score"], 60);
}
