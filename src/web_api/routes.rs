//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(super::health_check))
        // Dashboard
        .route("/api/dashboard/stats", get(dashboard_stats))
        // Telemetry
        .route("/api/samsara/vehicles", get(list_vehicles))
        // Inspections
        .route("/api/sitefotos/forms", get(list_forms))
        .route("/api/sitefotos/forms/submit", post(submit_form))
        // Displays
        .route("/api/displays", get(list_displays))
        .route("/api/viki/storm-dashboard/:display_index", get(activate_storm_dashboard))
        // Viewer channel
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

async fn dashboard_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.dashboard.stats().await;
    Json(json!({ "success": true, "stats": stats }))
}

#[derive(Debug, Deserialize)]
struct VehiclesQuery {
    #[serde(default)]
    refresh: bool,
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehiclesQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.dashboard.vehicles(query.refresh).await))
}

async fn list_forms(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.dashboard.forms().await))
}

/// Push intake for newly submitted inspection forms
async fn submit_form(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let form = state.dashboard.submit_form(body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Form submitted to dashboard",
        "id": form.id,
    })))
}

async fn list_displays(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.dashboard.displays().to_vec()))
}

/// Stream-deck button endpoint. Always answers 200 with a `success` flag.
async fn activate_storm_dashboard(
    State(state): State<AppState>,
    Path(display_index): Path<String>,
) -> impl IntoResponse {
    match state.dashboard.activate_display(&display_index).await {
        Ok(result) => Json(json!({
            "success": true,
            "message": format!("Storm Response Dashboard activated on {}", result.display),
            "display": result.display,
            "dashboardUrl": result.dashboard_url,
            "simulated": result.simulated,
            "viki": true,
        })),
        Err(e) => {
            tracing::warn!(display_index = %display_index, error = %e, "Display activation failed");
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "viki": true,
            }))
        }
    }
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // INITIAL_DATA is already queued on rx
    let (conn_id, mut rx) = state.realtime.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Viewers only listen; drain until close
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.realtime.unregister(&conn_id).await;
}
