//! Application state
//!
//! Holds all shared components and state

use crate::dashboard_service::DashboardService;
use crate::display_control::{DisplayActivator, DisplayControlClient, DisplayControlConfig, DisplayDevice};
use crate::error::Result;
use crate::fleet_telemetry::{FleetTelemetryClient, TelemetryConfig};
use crate::inspection_client::{InspectionClient, InspectionConfig};
use crate::polling_orchestrator::{PollingConfig, PollingOrchestrator};
use crate::realtime_hub::RealtimeHub;
use crate::snapshot_store::DashboardStore;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Static dashboard assets
    pub static_dir: PathBuf,
    /// Base URL displays are pointed at
    pub public_base_url: String,
    pub telemetry: TelemetryConfig,
    pub inspection: InspectionConfig,
    pub display_control: DisplayControlConfig,
    pub displays: Vec<DisplayDevice>,
    pub polling: PollingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            port,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}:{}", local_ipv4(), port)),
            telemetry: TelemetryConfig::from_env(),
            inspection: InspectionConfig::from_env(),
            display_control: DisplayControlConfig::from_env(),
            displays: DisplayDevice::defaults_from_env(),
            polling: PollingConfig::from_env(),
        }
    }
}

/// First non-loopback IPv4 of this host, `localhost` if none.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
fn local_ipv4() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .ok()
        .map(|addr| addr.ip())
        .filter(|ip| ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Latest snapshot per source
    pub store: Arc<DashboardStore>,
    /// RealtimeHub (viewer channels)
    pub realtime: Arc<RealtimeHub>,
    /// PollingOrchestrator (both schedules)
    pub polling: Arc<PollingOrchestrator>,
    /// Query surface used by the handlers
    pub dashboard: Arc<DashboardService>,
    pub telemetry: Arc<FleetTelemetryClient>,
    pub inspection: Arc<InspectionClient>,
    pub display_control: Arc<DisplayControlClient>,
}

impl AppState {
    /// Wire every component from config. Polling is not started.
    pub fn build(config: AppConfig) -> Result<Self> {
        let store = Arc::new(DashboardStore::new());
        let realtime = Arc::new(RealtimeHub::new(store.clone()));

        let telemetry = Arc::new(FleetTelemetryClient::new(config.telemetry.clone())?);
        let inspection = Arc::new(InspectionClient::new(config.inspection.clone())?);
        let display_control = Arc::new(DisplayControlClient::new(config.display_control.clone())?);

        let polling = Arc::new(PollingOrchestrator::new(
            store.clone(),
            realtime.clone(),
            telemetry.clone(),
            inspection.clone(),
            config.polling.clone(),
        ));

        let activator = Arc::new(DisplayActivator::new(
            display_control.clone(),
            config.displays.clone(),
            config.public_base_url.clone(),
        ));

        let dashboard = Arc::new(DashboardService::new(
            store.clone(),
            realtime.clone(),
            polling.clone(),
            activator,
        ));

        Ok(Self {
            config,
            store,
            realtime,
            polling,
            dashboard,
            telemetry,
            inspection,
            display_control,
        })
    }
}
