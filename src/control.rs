//! HTTP control surface: liveness probe plus the single mutation point
//! an operator has over the Supervisor loop, an operator-issued command.
//! Binds a plain axum router without TLS, since the env surface lists
//! no SSL-related variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;

use crate::model::Command;

#[derive(Clone)]
struct ControlState {
  command: Arc<Mutex<Command>>,
}

async fn liveness() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "UP" }))
}

async fn set_command(
  State(state): State<ControlState>,
  Json(body): Json<Command>,
) -> Json<serde_json::Value> {
  let mut command = state.command.lock().await;
  command.update_core |= body.update_core;
  command.update_services |= body.update_services;
  Json(serde_json::json!({ "status": "accepted" }))
}

pub async fn serve(
  bind_ip: String,
  port: u16,
  command: Arc<Mutex<Command>>,
) -> anyhow::Result<()> {
  let state = ControlState { command };
  let app = Router::new()
    .route("/health/liveness", get(liveness))
    .route("/cmd", post(set_command))
    .with_state(state);

  let addr = format!("{bind_ip}:{port}");
  let socket_addr =
    SocketAddr::from_str(&addr).context("failed to parse listen address")?;
  tracing::info!("control endpoint listening on http://{socket_addr}");
  axum_server::bind(socket_addr)
    .serve(app.into_make_service())
    .await
    .context("failed to start control endpoint")
}
