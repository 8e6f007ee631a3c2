//! HTTP surface for the connector bridge.
//!
//! Routes mirror the original bridge contract: `/health`, `/connectors`,
//! `/connectors/{connector_id}/execute`, `/mobile/dashboard`. Error kinds
//! map deterministically to status codes at this edge.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dashboard::{DashboardAssembler, DashboardView};
use crate::dispatch::{DispatchEngine, ExecuteRequest, ExecuteResult};
use crate::registry::ConnectorRegistry;

pub const SERVICE_NAME: &str = "connector-bridge";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectorRegistry>,
    pub dispatch: Arc<DispatchEngine>,
    pub dashboard: Arc<DashboardAssembler>,
}

/// Build the bridge router. The mobile app is served from arbitrary
/// origins, so CORS stays permissive like the original bridge.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/connectors", get(list_connectors))
        .route("/connectors/{connector_id}/execute", post(execute_connector))
        .route("/mobile/dashboard", get(mobile_dashboard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    info!("Starting connector bridge on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Process liveness only; says nothing about connector health
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "connectors_available": state.registry.len(),
    }))
}

async fn list_connectors(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "connectors": state.registry.list() }))
}

#[derive(Debug, Deserialize)]
struct ExecuteBody {
    tool: String,
    #[serde(default)]
    context: Map<String, Value>,
}

async fn execute_connector(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
    Json(body): Json<ExecuteBody>,
) -> (StatusCode, Json<ExecuteResult>) {
    let result = state
        .dispatch
        .execute(ExecuteRequest {
            connector: connector_id,
            tool: body.tool,
            context: body.context,
        })
        .await;

    let status = result
        .error
        .as_ref()
        .map(|e| e.kind.status())
        .unwrap_or(StatusCode::OK);
    (status, Json(result))
}

async fn mobile_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.assemble().await)
}
