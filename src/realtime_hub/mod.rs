//! RealtimeHub - Viewer Push Distribution
//!
//! ## Responsibilities
//!
//! - Viewer connection management
//! - INITIAL_DATA on connect, built from the store
//! - Delta broadcast after each schedule cycle and on pushed forms
//!
//! Delivery is fire-and-forget. A closed viewer channel is skipped and the
//! loop moves on; nothing is queued or retried.

use crate::alert_engine::GeofenceAlert;
use crate::fleet_telemetry::VehicleLocation;
use crate::inspection_client::{InspectionForm, StormPhoto};
use crate::snapshot_store::{DashboardSnapshot, DashboardStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HubMessage {
    /// Full snapshot, sent once per viewer on connect
    InitialData {
        vehicles: Vec<VehicleLocation>,
        #[serde(rename = "geofenceAlerts")]
        geofence_alerts: Vec<GeofenceAlert>,
        forms: Vec<InspectionForm>,
        photos: Vec<StormPhoto>,
    },
    /// Telemetry cycle result
    VehicleUpdate {
        vehicles: Vec<VehicleLocation>,
        #[serde(rename = "geofenceAlerts")]
        geofence_alerts: Vec<GeofenceAlert>,
    },
    /// Inspection cycle result
    SitefotosUpdate {
        forms: Vec<InspectionForm>,
        photos: Vec<StormPhoto>,
    },
    /// Form pushed outside the poll schedule
    NewSitefotosForm { form: InspectionForm },
}

impl HubMessage {
    pub fn initial(snapshot: DashboardSnapshot) -> Self {
        HubMessage::InitialData {
            vehicles: snapshot.vehicles,
            geofence_alerts: snapshot.alerts,
            forms: snapshot.forms,
            photos: snapshot.photos,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HubMessage::InitialData { .. } => "INITIAL_DATA",
            HubMessage::VehicleUpdate { .. } => "VEHICLE_UPDATE",
            HubMessage::SitefotosUpdate { .. } => "SITEFOTOS_UPDATE",
            HubMessage::NewSitefotosForm { .. } => "NEW_SITEFOTOS_FORM",
        }
    }
}

/// Per-broadcast delivery tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Viewers whose channel was already closed
    pub skipped: Vec<Uuid>,
}

/// Viewer connection
struct ViewerConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    store: Arc<DashboardStore>,
    connections: RwLock<HashMap<Uuid, ViewerConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new(store: Arc<DashboardStore>) -> Self {
        Self {
            store,
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new viewer.
    ///
    /// INITIAL_DATA is queued on the channel while the connection table is
    /// write-locked, so it always precedes any delta for this viewer.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut connections = self.connections.write().await;

        let initial = HubMessage::initial(self.store.snapshot().await);
        match serde_json::to_string(&initial) {
            Ok(json) => {
                // receiver is still in hand, cannot be closed yet
                let _ = tx.send(json);
            }
            Err(e) => tracing::error!(connection_id = %id, error = %e, "Failed to serialize initial data"),
        }

        connections.insert(id, ViewerConnection { id, tx });
        drop(connections);

        self.connection_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %id, "Viewer connected");

        (id, rx)
    }

    /// Unregister a viewer
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Viewer disconnected");
        }
    }

    /// Broadcast message to all viewers
    pub async fn broadcast(&self, message: HubMessage) -> BroadcastReport {
        let msg_type = message.type_name();
        let mut report = BroadcastReport::default();

        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(message_type = %msg_type, error = %e, "Failed to serialize message");
                return report;
            }
        };

        let connections = self.connections.read().await;
        tracing::debug!(message_type = %msg_type, viewer_count = connections.len(), "Broadcasting to viewers");

        for conn in connections.values() {
            if conn.tx.is_closed() {
                report.skipped.push(conn.id);
                continue;
            }
            match conn.tx.send(json.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
                    report.skipped.push(conn.id);
                }
            }
        }

        if !report.skipped.is_empty() {
            tracing::debug!(
                message_type = %msg_type,
                skipped = report.skipped.len(),
                "Skipped closed viewer channels"
            );
        }

        report
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}
