//! WebAPI - REST + WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes over `DashboardService`
//! - Viewer WebSocket
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};

use crate::models::{DataOrigin, HealthResponse, SourceHealth, SourcesHealth};
use crate::snapshot_store::SourceKind;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let sources = SourcesHealth {
        telemetry: source(
            state.telemetry.is_configured(),
            state.store.freshness(SourceKind::Telemetry).await,
        ),
        forms: source(
            state.inspection.is_configured(),
            state.store.freshness(SourceKind::Forms).await,
        ),
        photos: source(
            state.inspection.is_configured(),
            state.store.freshness(SourceKind::Photos).await,
        ),
        display_control: SourceHealth {
            configured: state.display_control.is_configured(),
            origin: None,
            updated_at: None,
        },
    };

    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        viewers: state.realtime.connection_count(),
        sources,
    })
}

fn source(configured: bool, (origin, updated_at): (Option<DataOrigin>, Option<DateTime<Utc>>)) -> SourceHealth {
    SourceHealth {
        configured,
        origin,
        updated_at,
    }
}
