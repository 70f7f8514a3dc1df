//! PollingOrchestrator - Scheduled Source Refresh
//!
//! ## Responsibilities
//!
//! - Telemetry schedule: vehicles → alerts → VEHICLE_UPDATE (30s)
//! - Inspection schedule: forms, then photos → SITEFOTOS_UPDATE (60s)
//! - On-demand telemetry refresh for the vehicles endpoint
//!
//! The two schedules run as separate tasks and never wait on each other.
//! Within one schedule at most one tick is in flight: a tick that finds the
//! previous one still running is skipped, not queued.

use crate::fleet_telemetry::FleetTelemetryClient;
use crate::inspection_client::InspectionClient;
use crate::realtime_hub::{HubMessage, RealtimeHub};
use crate::snapshot_store::{CommitOutcome, DashboardStore, SourceKind};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Schedule periods
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub telemetry_interval: Duration,
    pub inspection_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            telemetry_interval: Duration::from_secs(30),
            inspection_interval: Duration::from_secs(60),
        }
    }
}

impl PollingConfig {
    pub fn from_env() -> Self {
        let secs = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            telemetry_interval: Duration::from_secs(secs("VEHICLE_POLL_INTERVAL_SECS", 30)),
            inspection_interval: Duration::from_secs(secs("INSPECTION_POLL_INTERVAL_SECS", 60)),
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// Previous tick of the same schedule still in flight
    Skipped,
}

/// PollingOrchestrator instance
pub struct PollingOrchestrator {
    store: Arc<DashboardStore>,
    hub: Arc<RealtimeHub>,
    telemetry: Arc<FleetTelemetryClient>,
    inspection: Arc<InspectionClient>,
    config: PollingConfig,
    telemetry_gate: Mutex<()>,
    inspection_gate: Mutex<()>,
    running: RwLock<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PollingOrchestrator {
    /// Create new PollingOrchestrator
    pub fn new(
        store: Arc<DashboardStore>,
        hub: Arc<RealtimeHub>,
        telemetry: Arc<FleetTelemetryClient>,
        inspection: Arc<InspectionClient>,
        config: PollingConfig,
    ) -> Self {
        Self {
            store,
            hub,
            telemetry,
            inspection,
            config,
            telemetry_gate: Mutex::new(()),
            inspection_gate: Mutex::new(()),
            running: RwLock::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start both schedules. The first tick of each runs immediately.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Polling already running");
                return;
            }
            *running = true;
        }

        tracing::info!(
            telemetry_interval_sec = self.config.telemetry_interval.as_secs(),
            inspection_interval_sec = self.config.inspection_interval.as_secs(),
            "Starting polling orchestrator"
        );

        let telemetry_task = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = interval(this.config.telemetry_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !*this.running.read().await {
                        break;
                    }
                    if this.tick_telemetry().await == TickOutcome::Skipped {
                        tracing::debug!("Telemetry tick skipped - previous tick in flight");
                    }
                }
                tracing::info!("Telemetry schedule stopped");
            })
        };

        let inspection_task = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = interval(this.config.inspection_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !*this.running.read().await {
                        break;
                    }
                    if this.tick_inspection().await == TickOutcome::Skipped {
                        tracing::debug!("Inspection tick skipped - previous tick in flight");
                    }
                }
                tracing::info!("Inspection schedule stopped");
            })
        };

        self.tasks.lock().await.extend([telemetry_task, inspection_task]);
    }

    /// Stop both schedules. In-flight fetches are abandoned.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        tracing::info!("Stopping polling orchestrator");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One telemetry tick, skipped if the previous one is still running
    pub async fn tick_telemetry(&self) -> TickOutcome {
        let Ok(_guard) = self.telemetry_gate.try_lock() else {
            return TickOutcome::Skipped;
        };
        self.refresh_telemetry().await;
        TickOutcome::Completed
    }

    /// One inspection tick, skipped if the previous one is still running
    pub async fn tick_inspection(&self) -> TickOutcome {
        let Ok(_guard) = self.inspection_gate.try_lock() else {
            return TickOutcome::Skipped;
        };
        self.refresh_inspection().await;
        TickOutcome::Completed
    }

    /// Fetch vehicles, commit, broadcast.
    ///
    /// Not gated: may overlap a scheduled tick, in which case the store keeps
    /// whichever fetch started last.
    pub async fn refresh_telemetry(&self) -> CommitOutcome {
        let ticket = self.store.begin_fetch(SourceKind::Telemetry);
        let result = self.telemetry.fetch_vehicle_locations().await;
        let outcome = self.store.commit_telemetry(ticket, result, Utc::now()).await;

        if outcome == CommitOutcome::Stale {
            return outcome;
        }

        let snapshot = self.store.telemetry().await;
        tracing::debug!(
            vehicles = snapshot.vehicles.len(),
            alerts = snapshot.alerts.len(),
            "Telemetry cycle complete"
        );
        self.hub
            .broadcast(HubMessage::VehicleUpdate {
                vehicles: snapshot.vehicles,
                geofence_alerts: snapshot.alerts,
            })
            .await;

        outcome
    }

    /// Fetch forms then photos, commit each, broadcast once
    pub async fn refresh_inspection(&self) {
        let forms_ticket = self.store.begin_fetch(SourceKind::Forms);
        let forms = self.inspection.fetch_forms().await;
        let forms_outcome = self.store.commit_forms(forms_ticket, forms, Utc::now()).await;

        let photos_ticket = self.store.begin_fetch(SourceKind::Photos);
        let photos = self.inspection.fetch_photos().await;
        let photos_outcome = self.store.commit_photos(photos_ticket, photos, Utc::now()).await;

        if forms_outcome == CommitOutcome::Stale && photos_outcome == CommitOutcome::Stale {
            return;
        }

        let forms = self.store.forms().await;
        let photos = self.store.photos().await;
        tracing::debug!(forms = forms.len(), photos = photos.len(), "Inspection cycle complete");
        self.hub
            .broadcast(HubMessage::SitefotosUpdate { forms, photos })
            .await;
    }
}
