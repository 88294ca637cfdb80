//! The HTTP ingest (C10): one axum handler per route in the external
//! interface table (§6), each building a [`SimulationAction`], submitting it
//! across the bridge's inbound channel, and awaiting a one-shot reply.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use blocksworld_core::action::StackConfig;
use blocksworld_core::{ActionKind, ActionReply, PlanMode, PlanStep, ReplyChannel, ScenarioRegistry, SimulationAction};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    inbound: mpsc::Sender<SimulationAction>,
    scenarios: Arc<ScenarioRegistry>,
}

/// The bridge's inbound channel is `std::sync::mpsc`, per SPEC_FULL §5; axum
/// handlers are tokio tasks, so each one gets its own bounded `tokio::sync`
/// sender that forwards onto the std channel on a dedicated relay task,
/// avoiding a blocking send from async code.
pub fn app_state(std_inbound: std::sync::mpsc::Sender<SimulationAction>, scenarios: Arc<ScenarioRegistry>) -> AppState {
    let (tokio_tx, mut tokio_rx) = mpsc::channel::<SimulationAction>(1024);
    tokio::task::spawn_blocking(move || {
        while let Some(action) = tokio_rx.blocking_recv() {
            if std_inbound.send(action).is_err() {
                break;
            }
        }
    });
    AppState {
        inbound: tokio_tx,
        scenarios,
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start_simulation", post(start_simulation))
        .route("/stop_simulation", post(stop_simulation))
        .route("/quit", post(quit))
        .route("/pick_up", post(pick_up))
        .route("/put_down", post(put_down))
        .route("/stack", post(stack))
        .route("/unstack", post(unstack))
        .route("/execute_plan", post(execute_plan))
        .route("/verify_plan", post(verify_plan))
        .route("/scenarios", get(list_scenarios))
        .route("/scenarios/:name_or_id", get(get_scenario))
        .route("/get_status", get(get_status))
        .route("/get_full_status", get(get_full_status))
        .route("/get_rules", get(get_rules))
        .with_state(state)
}

async fn submit(state: &AppState, kind: ActionKind) -> ActionReply {
    let request_id = uuid::Uuid::new_v4();
    let (tx, rx) = oneshot::channel();
    let reply = ReplyChannel::new(move |r| {
        let _ = tx.send(r);
    });
    let action = SimulationAction::new(kind, Some(reply));
    info!(%request_id, action = action.kind.name(), "-->");
    if state.inbound.send(action).await.is_err() {
        return ActionReply::failure("the simulation bridge has shut down");
    }
    let reply = rx
        .await
        .unwrap_or_else(|_| ActionReply::failure("the simulation bridge dropped the reply"));
    log_reply(request_id, &reply);
    reply
}

fn log_reply(request_id: uuid::Uuid, reply: &ActionReply) {
    if reply.success {
        info!(%request_id, message = %reply.message, "<-- 200");
    } else {
        warn!(%request_id, message = %reply.message, "<-- 400");
    }
}

/// Every route wraps its payload in `{"result": ...}`, matching the
/// reference implementation's `return_api` helper exactly: `result` is the
/// attached data when present (e.g. a status dict), otherwise the plain
/// message string.
fn respond(reply: ActionReply) -> (StatusCode, Json<Value>) {
    let status = if reply.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    let payload = reply.data.unwrap_or_else(|| json!(reply.message));
    (status, Json(json!({ "result": payload })))
}

#[derive(Debug, Default, Deserialize)]
pub struct StartSimulationRequest {
    #[serde(default)]
    scenario_id: Option<String>,
    #[serde(default)]
    initial_stacks: Option<StackConfig>,
    #[serde(default)]
    constraint_set: Option<String>,
}

async fn start_simulation(
    State(state): State<AppState>,
    Json(req): Json<StartSimulationRequest>,
) -> impl IntoResponse {
    let reply = submit(
        &state,
        ActionKind::PreStart {
            scenario_id: req.scenario_id,
            constraint_set: req.constraint_set,
            stack_config: req.initial_stacks,
            resolved: None,
        },
    )
    .await;
    respond(reply)
}

async fn stop_simulation(State(state): State<AppState>) -> impl IntoResponse {
    respond(submit(&state, ActionKind::Stop).await)
}

async fn quit(State(state): State<AppState>) -> impl IntoResponse {
    let reply = submit(&state, ActionKind::Quit).await;
    respond(reply)
}

#[derive(Debug, Deserialize)]
struct BlockRequest {
    block: char,
}

async fn pick_up(State(state): State<AppState>, Json(req): Json<BlockRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::PickUp {
                block: req.block,
                resolved: Default::default(),
            },
        )
        .await,
    )
}

async fn put_down(State(state): State<AppState>, Json(req): Json<BlockRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::PutDown {
                block: req.block,
                resolved: Default::default(),
            },
        )
        .await,
    )
}

#[derive(Debug, Deserialize)]
struct TwoBlockRequest {
    block1: char,
    block2: char,
}

async fn stack(State(state): State<AppState>, Json(req): Json<TwoBlockRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::StackOn {
                block: req.block1,
                target: req.block2,
                resolved: Default::default(),
            },
        )
        .await,
    )
}

async fn unstack(State(state): State<AppState>, Json(req): Json<TwoBlockRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::Unstack {
                block: req.block1,
                below: req.block2,
                resolved: Default::default(),
            },
        )
        .await,
    )
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    plan: Vec<PlanStep>,
}

async fn execute_plan(State(state): State<AppState>, Json(req): Json<PlanRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::Plan {
                steps: req.plan,
                mode: PlanMode::Execute,
            },
        )
        .await,
    )
}

async fn verify_plan(State(state): State<AppState>, Json(req): Json<PlanRequest>) -> impl IntoResponse {
    respond(
        submit(
            &state,
            ActionKind::Plan {
                steps: req.plan,
                mode: PlanMode::Verify,
            },
        )
        .await,
    )
}

/// Bypasses the action pipeline entirely: no action kind models "list every
/// scenario", so this reads directly off the shared registry clone handed
/// to `AppState` at startup (read-only after init, per §4.5).
async fn list_scenarios(State(state): State<AppState>) -> impl IntoResponse {
    let scenarios: Vec<Value> = state
        .scenarios
        .list()
        .map(|s| serde_json::to_value(s).expect("fatal: Scenario must always serialize to JSON"))
        .collect();
    (StatusCode::OK, Json(json!({ "scenarios": scenarios })))
}

async fn get_scenario(State(state): State<AppState>, Path(name_or_id): Path<String>) -> impl IntoResponse {
    let reply = submit(&state, ActionKind::GetScenario { id_or_name: name_or_id }).await;
    if !reply.success {
        warn!(message = %reply.message, "404");
        return (StatusCode::NOT_FOUND, Json(json!({ "result": reply.message })));
    }
    let payload = reply.data.unwrap_or_else(|| json!(reply.message));
    (StatusCode::OK, Json(json!({ "result": payload })))
}

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    respond(submit(&state, ActionKind::GetStatus).await)
}

async fn get_full_status(State(state): State<AppState>) -> impl IntoResponse {
    respond(submit(&state, ActionKind::GetFullStatus).await)
}

async fn get_rules(State(state): State<AppState>) -> impl IntoResponse {
    respond(submit(&state, ActionKind::GetRules).await)
}
