//! Storm Response Dashboard
//!
//! Main entry point for the dashboard server.

use storm_dashboard::{state::AppConfig, web_api, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn configured(flag: bool) -> &'static str {
    if flag {
        "configured"
    } else {
        "not configured"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storm_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Storm Response Dashboard v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        telemetry = configured(config.telemetry.is_configured()),
        fleet_id = ?config.telemetry.fleet_id,
        inspection = configured(config.inspection.is_configured()),
        display_control = configured(config.display_control.is_configured()),
        location_id = ?config.display_control.location_id,
        displays = config.displays.len(),
        public_base_url = %config.public_base_url,
        "Configuration loaded"
    );

    let state = AppState::build(config)?;

    // Start polling (first tick of each schedule runs immediately)
    state.polling.start().await;
    tracing::info!("PollingOrchestrator started");

    // Router with static dashboard assets
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = web_api::create_router(state.clone())
        .route_service("/dashboard", ServeFile::new(static_dir.join("dashboard.html")))
        .fallback_service(serve_dir)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    for (index, device) in state.config.displays.iter().enumerate() {
        tracing::info!(
            display = %device.name,
            url = %format!("http://localhost:{}/api/viki/storm-dashboard/{}", state.config.port, index),
            "Display activation endpoint"
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    state.polling.stop().await;

    Ok(())
}
