#![cfg(feature = "server")]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use mathquiz::http::{router, AppState};
use mathquiz::{
    ContestManager, GameConfig, MemoryStore, Participant, ParticipantStore, ProblemStore,
    SessionManager,
};
use serde_json::{json, Value};

fn test_server() -> (TestServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let participants: Arc<dyn ParticipantStore> = store.clone();
    let problems: Arc<dyn ProblemStore> = store.clone();
    let sessions = SessionManager::new(participants.clone(), GameConfig::default());
    let contest = ContestManager::new(participants.clone(), problems);
    let server = TestServer::new(router(AppState {
        sessions,
        contest,
        participants,
    }))
    .unwrap();
    (server, store)
}

/// Pulls "a + b = ?" out of the last line of a message and answers it.
fn solve_sum(text: &str) -> String {
    let line = text.lines().last().unwrap();
    let mut parts = line.split_whitespace();
    let a: i64 = parts.next().unwrap().parse().unwrap();
    parts.next();
    let b: i64 = parts.next().unwrap().parse().unwrap();
    (a + b).to_string()
}

#[tokio::test]
async fn root_reports_the_api() {
    let (server, _store) = test_server();
    let response = server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "mathquiz");
    assert!(body["endpoints"]["start_game"].is_string());
}

#[tokio::test]
async fn register_start_answer_cancel() {
    let (server, _store) = test_server();

    let response = server
        .post("/participants")
        .json(&json!({"id": 1, "name": "Ada", "class": "101"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(
        body["message"].as_str().unwrap().contains("Welcome, Ada"),
        "got: {}",
        body
    );

    let response = server
        .post("/games")
        .json(&json!({"participant_id": 1, "kind": "addition"}))
        .await;
    response.assert_status_ok();
    let intro = response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(intro.contains("= ?"), "got: {}", intro);

    let response = server
        .post("/games/1/answer")
        .json(&json!({"text": solve_sum(&intro)}))
        .await;
    response.assert_status_ok();
    let feedback: Value = response.json();
    assert!(
        feedback["message"].as_str().unwrap().starts_with("Correct!"),
        "got: {}",
        feedback
    );

    let response = server.get("/games/1").await;
    assert!(response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .contains("= ?"));

    let response = server.delete("/games/1").await;
    assert_eq!(
        response.json::<Value>()["message"].as_str().unwrap(),
        "Game cancelled. Nothing was scored."
    );
    // The second cancel finds nothing; that is not an error.
    let response = server.delete("/games/1").await;
    assert!(response.json::<Value>()["message"].is_null());
}

#[tokio::test]
async fn starting_without_registration_is_a_client_error() {
    let (server, _store) = test_server();
    let response = server
        .post("/games")
        .json(&json!({"participant_id": 9, "kind": "quiz"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("enter your name and class"),
        "got: {}",
        body
    );
}

#[tokio::test]
async fn registration_rejects_bad_names_and_classes() {
    let (server, _store) = test_server();

    let response = server
        .post("/participants")
        .json(&json!({"id": 1, "name": "   ", "class": "101"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .is_empty());

    let response = server
        .post("/participants")
        .json(&json!({"id": 1, "name": "Ada", "class": "not a class!"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leaderboard_scopes_and_validation() {
    let (server, store) = test_server();
    store.upsert(Participant::new(1, "Ada", "101")).unwrap();
    store.add_points(1, 12.5).unwrap();

    let response = server.get("/leaderboard/all").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.starts_with("All-time leaderboard:"), "got: {}", text);
    assert!(text.contains("1. Ada: 12.5"), "got: {}", text);

    // Nobody has an addition high score on record yet.
    let response = server.get("/leaderboard/addition").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "No players on the scoreboard yet.");

    let response = server.get("/leaderboard/bogus").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contest_announce_answer_and_settle() {
    let (server, store) = test_server();
    store.upsert(Participant::new(1, "Ada", "101")).unwrap();

    let response = server
        .post("/contest/monthly/announce")
        .json(&json!({"kind": "addition"}))
        .await;
    response.assert_status_ok();
    let prompt = response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server
        .post("/contest/monthly/answer")
        .json(&json!({"participant_id": 1, "text": solve_sum(&prompt)}))
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .starts_with("Correct!"));
    assert_eq!(store.get(1).unwrap().unwrap().month_points, Some(1.0));

    let response = server.post("/contest/settle").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["settled"], 1);
    let settled = store.get(1).unwrap().unwrap();
    assert_eq!(settled.points, 200.0);
    assert_eq!(settled.month_points, None);

    // Contest answers also require registration.
    let response = server
        .post("/contest/weekly/answer")
        .json(&json!({"participant_id": 9, "text": "4"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/contest/daily/announce")
        .json(&json!({"kind": "addition"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
