//! Integration tests driving the full HTTP surface (§6/§8 of SPEC_FULL)
//! against a server spawned on an ephemeral port in-process — no external
//! process, no mocked transport. Covers the six literal end-to-end scenarios
//! from the base specification verbatim.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blocksworld_core::{ScenarioRegistry, Sim, SimConfig};
use blocksworld_server::interactive::NullInteractiveIngest;
use blocksworld_server::render::NullRenderer;
use blocksworld_server::{bridge, http};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(SimConfig::default()).await
    }

    async fn spawn_with(config: SimConfig) -> Self {
        let scenarios = ScenarioRegistry::empty();
        let scenarios_for_listing = Arc::new(scenarios.clone());
        let sim = Sim::new(scenarios, config);
        let bridge = bridge::spawn(sim, Box::new(NullInteractiveIngest), Box::new(NullRenderer));
        let state = http::app_state(bridge.inbound, scenarios_for_listing);
        let app = http::router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().expect("listener must have a local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self { addr, client }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request must reach the server");
        let status = resp.status();
        let body: Value = resp.json().await.expect("response must be JSON");
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("request must reach the server");
        let status = resp.status();
        let body: Value = resp.json().await.expect("response must be JSON");
        (status, body)
    }
}

fn stack_names(status: &Value, index: usize) -> Vec<String> {
    status["result"]["stacks"][index]["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect()
}

// --- §8 literal scenario 1: random start + status ---------------------------

#[tokio::test]
async fn random_start_then_status() {
    let server = TestServer::spawn_with(SimConfig::deterministic(3, 4)).await;

    let (status, _) = server.post("/start_simulation", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.get("/get_status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["robot"]["state"], "idle");
    assert!(body["result"]["robot"]["held_block"].is_null());

    let names: std::collections::HashSet<String> = body["result"]["stacks"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| {
            s["blocks"]
                .as_array()
                .unwrap()
                .iter()
                .map(|b| b["name"].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(names.len(), 4);
    for expected in ['A', 'B', 'C', 'D'] {
        assert!(names.contains(&expected.to_string()));
    }
}

// --- §8 literal scenario 2: pick-up on ground -------------------------------

#[tokio::test]
async fn pick_up_on_ground() {
    let server = TestServer::spawn().await;

    let (status, _) = server
        .post("/start_simulation", json!({ "initial_stacks": [["A"], [], []] }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.post("/pick_up", json!({ "block": "A" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Block A picked up successfully from stack 1");

    let (_, body) = server.get("/get_status").await;
    assert_eq!(body["result"]["robot"]["state"], "holding");
    assert_eq!(body["result"]["robot"]["held_block"]["name"], "A");
    for stack in body["result"]["stacks"].as_array().unwrap() {
        assert!(stack["blocks"].as_array().unwrap().is_empty());
    }
}

// --- §8 literal scenario 3: pick-up refused when stacked --------------------

#[tokio::test]
async fn pick_up_refused_when_not_on_top() {
    let server = TestServer::spawn().await;

    server
        .post("/start_simulation", json!({ "initial_stacks": [["A", "B"], [], []] }))
        .await;

    let (status, body) = server.post("/pick_up", json!({ "block": "A" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["result"].as_str().unwrap().contains("is not on top"));
}

// --- §8 literal scenario 4: unstack + stack ---------------------------------

#[tokio::test]
async fn unstack_then_stack() {
    let server = TestServer::spawn().await;

    server
        .post(
            "/start_simulation",
            json!({ "initial_stacks": [["A", "B"], [], ["C"]] }),
        )
        .await;

    let (status, _) = server
        .post("/unstack", json!({ "block1": "B", "block2": "A" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.post("/stack", json!({ "block1": "B", "block2": "C" })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.get("/get_status").await;
    assert_eq!(stack_names(&body, 0), vec!["A"]);
    assert_eq!(stack_names(&body, 1), Vec::<String>::new());
    assert_eq!(stack_names(&body, 2), vec!["C", "B"]);
    assert_eq!(body["result"]["robot"]["state"], "idle");
}

// --- §8 literal scenario 5: plan verify is a no-op --------------------------

#[tokio::test]
async fn verify_plan_does_not_mutate_state() {
    let server = TestServer::spawn().await;

    server
        .post("/start_simulation", json!({ "initial_stacks": [["A", "B"], [], []] }))
        .await;

    let (_, before) = server.get("/get_status").await;

    let (status, body) = server
        .post(
            "/verify_plan",
            json!({
                "plan": [
                    { "action": "unstack", "block1": "B", "block2": "A" },
                    { "action": "put_down", "block": "B" },
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"].as_str().unwrap().contains("valid"));

    let (_, after) = server.get("/get_status").await;
    assert_eq!(before["result"]["stacks"], after["result"]["stacks"]);
    assert_eq!(before["result"]["robot"], after["result"]["robot"]);
}

// --- §8 literal scenario 6: plan abort report -------------------------------

#[tokio::test]
async fn execute_plan_abort_reports_executed_offending_and_skipped() {
    let server = TestServer::spawn().await;

    server
        .post("/start_simulation", json!({ "initial_stacks": [["A"], ["B"], []] }))
        .await;

    let (status, body) = server
        .post(
            "/execute_plan",
            json!({
                "plan": [
                    { "action": "pick_up", "block": "A" },
                    { "action": "pick_up", "block": "B" },
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["result"].as_str().unwrap();
    assert!(message.contains("step 1: pick_up(A) - executed"));
    assert!(message.contains("offending"));
    assert!(message.contains("pick_up(B)"));
    assert!(message.to_lowercase().contains("not idle"));

    let (_, status_body) = server.get("/get_status").await;
    assert_eq!(status_body["result"]["robot"]["state"], "holding");
    assert_eq!(status_body["result"]["robot"]["held_block"]["name"], "A");
}

// --- supplementary: scenario listing and 404 --------------------------------

#[tokio::test]
async fn unknown_scenario_is_404() {
    let server = TestServer::spawn().await;
    server.post("/start_simulation", json!({})).await;

    let (status, _) = server.get("/scenarios/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_status_before_start_is_rejected() {
    let server = TestServer::spawn().await;
    let (status, body) = server.get("/get_status").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["result"].as_str().unwrap().contains("not running"));
}
