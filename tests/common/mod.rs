#![allow(dead_code)]

use bonus_vote::config::{ApiConfig, CacheConfig};
use bonus_vote::{Config, VotingClient};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ME: i64 = 1;

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api: ApiConfig {
            base_url: format!("{}/api/v1", server.uri()),
            timeout_secs: 5,
        },
        cache: CacheConfig::default(),
    }
}

pub fn client_for(server: &MockServer) -> VotingClient {
    VotingClient::new(&config_for(server)).unwrap()
}

pub fn user_json(id: i64, role: &str) -> Value {
    json!({"user_id": id, "name": format!("user {id}"), "role": role})
}

pub async fn mount_login(server: &MockServer, token: &str, role: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/telegram"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "token": token,
            "user": user_json(ME, role),
        })))
        .mount(server)
        .await;
}

/// A logged-in client holding `token`.
pub async fn signed_in(server: &MockServer, token: &str) -> VotingClient {
    mount_login(server, token, "user").await;
    let client = client_for(server);
    client.authenticate("init-data").await.unwrap();
    client
}

pub fn session_json(id: i64, active: bool) -> Value {
    json!({
        "status": "success",
        "session": {
            "session_id": id,
            "start_date": "2025-03-03",
            "end_date": "2025-03-09",
            "active": active,
            "can_vote": true
        }
    })
}

pub fn participant_json(id: i64, receives: bool, status: &str) -> Value {
    json!({
        "user_id": id,
        "name": format!("user {id}"),
        "can_vote": true,
        "can_receive_votes": receives,
        "status": status
    })
}

pub async fn mount_participants(server: &MockServer, session_id: i64, participants: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/sessions/{session_id}/participants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "participants": participants,
        })))
        .mount(server)
        .await;
}

pub async fn mount_current_session(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/sessions/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
