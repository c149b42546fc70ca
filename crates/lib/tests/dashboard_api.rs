//! Integration tests: start the dashboard on a free port and drive it over HTTP.
//! Does not require Slack. Server tasks are left running when a test ends.

use async_trait::async_trait;
use csuite::config::Config;
use csuite::dashboard::{self, ChatMessage, DashboardState, MessageRepository, MessageScope};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Serve `state` on an ephemeral port; returns the base URL.
async fn spawn_dashboard(state: DashboardState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = dashboard::serve(listener, state, std::future::pending()).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn dashboard_health_http_responds_with_running() {
    let port = free_port();
    let mut config = Config::default();
    config.dashboard.port = port;
    config.dashboard.bind = "127.0.0.1".to_string();

    let handle = tokio::spawn(async move {
        let _ = dashboard::run_dashboard(config).await;
    });

    let url = format!("http://127.0.0.1:{}/", port);
    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let json: Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
                assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
                return;
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    handle.abort();
    panic!(
        "GET {} did not return 200 with health JSON within 5s; last error: {:?}",
        url, last_err
    );
}

#[tokio::test]
async fn agents_route_lists_the_fixed_roster() {
    let base = spawn_dashboard(DashboardState::in_memory(0)).await;
    let json: Value = reqwest::get(format!("{}/api/agents", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let agents = json["agents"].as_array().expect("agents array");
    assert_eq!(agents.len(), 4);
    assert_eq!(agents[0]["id"], "ceo");
    assert_eq!(agents[0]["name"], "CEO Agent");
    assert_eq!(agents[0]["avatar"], "/ceo-agent.png");
    assert!(agents.iter().all(|a| a["status"] == "initialized"));
}

#[tokio::test]
async fn start_route_acknowledges_any_id() {
    let base = spawn_dashboard(DashboardState::in_memory(0)).await;
    let client = reqwest::Client::new();
    for id in ["ceo", "not-an-agent"] {
        let resp = client
            .post(format!("{}/api/agents/{}/start", base, id))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json, json!({ "success": true, "id": id }));
    }
}

#[tokio::test]
async fn global_post_then_get_returns_the_message() {
    let base = spawn_dashboard(DashboardState::in_memory(0)).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/messages/global", base);

    let posted: Value = client
        .post(&url)
        .json(&json!({ "text": "hi" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posted["message"]["text"], "hi");
    assert_eq!(posted["message"]["author"], "user");
    assert!(posted["message"].get("sender").is_none());

    let listed: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let messages = listed["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hi");
    assert_eq!(messages[0], posted["message"]);
}

#[tokio::test]
async fn conversation_get_ends_with_the_posted_message() {
    let base = spawn_dashboard(DashboardState::in_memory(0)).await;
    let client = reqwest::Client::new();
    let conversation = format!("conv-{}", uuid::Uuid::new_v4());
    let url = format!("{}/api/messages/{}", base, conversation);

    let empty: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(empty, json!({ "messages": [] }));

    let mut ids = Vec::new();
    let mut last = Value::Null;
    for (sender, text) in [("cfo", "numbers are in"), ("ceo", "thanks")] {
        let posted: Value = client
            .post(&url)
            .json(&json!({ "sender": sender, "text": text }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(posted["message"]["id"].as_str().unwrap().parse::<u64>().unwrap());
        last = posted["message"].clone();
    }
    assert!(ids[0] < ids[1], "ids must increase: {:?}", ids);

    let listed: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let messages = listed["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages.last().unwrap(), &last);
    assert_eq!(last["sender"], "ceo");
    assert!(last.get("author").is_none());

    let global: Value = client
        .get(format!("{}/api/messages/global", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(global, json!({ "messages": [] }));
}

/// Records appends instead of storing them.
#[derive(Default)]
struct RecordingRepository {
    appended: Mutex<Vec<(MessageScope, ChatMessage)>>,
}

#[async_trait]
impl MessageRepository for RecordingRepository {
    async fn list(&self, _scope: &MessageScope) -> Vec<ChatMessage> {
        Vec::new()
    }

    async fn append(&self, scope: &MessageScope, message: ChatMessage) {
        self.appended.lock().await.push((scope.clone(), message));
    }
}

#[tokio::test]
async fn routes_use_the_injected_repository() {
    let repo = Arc::new(RecordingRepository::default());
    let base = spawn_dashboard(DashboardState::new(0, repo.clone())).await;

    reqwest::Client::new()
        .post(format!("{}/api/messages/board", base))
        .json(&json!({ "author": "clo", "text": "filed" }))
        .send()
        .await
        .unwrap();

    let appended = repo.appended.lock().await;
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].0, MessageScope::Conversation("board".to_string()));
    assert_eq!(appended[0].1.author, "clo");
    assert_eq!(appended[0].1.text, "filed");
}
