//! SnapshotStore - Last Known Good State
//!
//! ## Responsibilities
//!
//! - Hold the latest vehicles/alerts, forms and photos
//! - Order commits by fetch start, not by completion
//! - Keep live data when a later fetch only produced fallback data
//!
//! Each slice is replaced in one assignment under its own lock, so readers
//! never see a half-applied update. Only the owning source writes a slice;
//! the one exception is `prepend_form` for pushed forms.

use crate::alert_engine::{self, DashboardStats, GeofenceAlert};
use crate::fleet_telemetry::VehicleLocation;
use crate::inspection_client::{InspectionForm, StormPhoto};
use crate::models::{DataOrigin, SourceResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Data sources with their own slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Telemetry,
    Forms,
    Photos,
}

/// Issued when a fetch starts; a later ticket always wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    source: SourceKind,
    seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Result of a commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Slice replaced
    Applied,
    /// A fetch that started later already committed
    Stale,
    /// Fallback data discarded because the slice holds live data
    KeptLive,
}

impl CommitOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, CommitOutcome::Applied)
    }
}

/// One source's state
#[derive(Debug, Clone)]
pub struct Slice<T> {
    pub data: T,
    /// Ticket of the fetch that produced `data` (0 = never committed)
    pub seq: u64,
    pub origin: Option<DataOrigin>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T: Default> Default for Slice<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            seq: 0,
            origin: None,
            updated_at: None,
        }
    }
}

impl<T> Slice<T> {
    fn holds_live(&self) -> bool {
        matches!(self.origin, Some(DataOrigin::Live))
    }

    fn commit(&mut self, ticket: FetchTicket, result: SourceResult<T>, now: DateTime<Utc>) -> CommitOutcome {
        if ticket.seq <= self.seq {
            return CommitOutcome::Stale;
        }
        // The ticket still advances so an older fetch cannot land afterwards
        self.seq = ticket.seq;
        if result.is_fallback() && self.holds_live() {
            return CommitOutcome::KeptLive;
        }
        self.data = result.data;
        self.origin = Some(result.origin);
        self.updated_at = Some(now);
        CommitOutcome::Applied
    }
}

/// Vehicles with the alerts derived from them
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub vehicles: Vec<VehicleLocation>,
    pub alerts: Vec<GeofenceAlert>,
}

/// Everything a viewer needs on connect
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSnapshot {
    pub vehicles: Vec<VehicleLocation>,
    pub alerts: Vec<GeofenceAlert>,
    pub forms: Vec<InspectionForm>,
    pub photos: Vec<StormPhoto>,
}

/// Process state. Construct one per process (or one per test).
#[derive(Default)]
pub struct DashboardStore {
    telemetry: RwLock<Slice<TelemetrySnapshot>>,
    forms: RwLock<Slice<Vec<InspectionForm>>>,
    photos: RwLock<Slice<Vec<StormPhoto>>>,
    telemetry_seq: AtomicU64,
    forms_seq: AtomicU64,
    photos_seq: AtomicU64,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket before starting a fetch
    pub fn begin_fetch(&self, source: SourceKind) -> FetchTicket {
        let counter = match source {
            SourceKind::Telemetry => &self.telemetry_seq,
            SourceKind::Forms => &self.forms_seq,
            SourceKind::Photos => &self.photos_seq,
        };
        FetchTicket {
            source,
            seq: counter.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Commit a telemetry result and recompute alerts from whatever vehicle
    /// set the slice ends up holding.
    pub async fn commit_telemetry(
        &self,
        ticket: FetchTicket,
        result: SourceResult<Vec<VehicleLocation>>,
        now: DateTime<Utc>,
    ) -> CommitOutcome {
        debug_assert_eq!(ticket.source, SourceKind::Telemetry);
        let mut slice = self.telemetry.write().await;

        if ticket.seq <= slice.seq {
            tracing::debug!(ticket = ticket.seq, committed = slice.seq, "Discarding stale telemetry result");
            return CommitOutcome::Stale;
        }

        let alerts = if result.is_fallback() && slice.holds_live() {
            alert_engine::generate_alerts(&slice.data.vehicles, now)
        } else {
            alert_engine::generate_alerts(&result.data, now)
        };
        let result = SourceResult {
            data: TelemetrySnapshot {
                vehicles: result.data,
                alerts: Vec::new(),
            },
            origin: result.origin,
        };

        let outcome = slice.commit(ticket, result, now);
        slice.data.alerts = alerts;
        outcome
    }

    pub async fn commit_forms(
        &self,
        ticket: FetchTicket,
        result: SourceResult<Vec<InspectionForm>>,
        now: DateTime<Utc>,
    ) -> CommitOutcome {
        debug_assert_eq!(ticket.source, SourceKind::Forms);
        let outcome = self.forms.write().await.commit(ticket, result, now);
        if outcome == CommitOutcome::Stale {
            tracing::debug!(ticket = ticket.seq, "Discarding stale forms result");
        }
        outcome
    }

    pub async fn commit_photos(
        &self,
        ticket: FetchTicket,
        result: SourceResult<Vec<StormPhoto>>,
        now: DateTime<Utc>,
    ) -> CommitOutcome {
        debug_assert_eq!(ticket.source, SourceKind::Photos);
        let outcome = self.photos.write().await.commit(ticket, result, now);
        if outcome == CommitOutcome::Stale {
            tracing::debug!(ticket = ticket.seq, "Discarding stale photos result");
        }
        outcome
    }

    /// Put a pushed form at the front of the form list
    pub async fn prepend_form(&self, form: InspectionForm) {
        let mut slice = self.forms.write().await;
        slice.data.insert(0, form);
        slice.updated_at = Some(Utc::now());
    }

    pub async fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.read().await.data.clone()
    }

    pub async fn vehicles(&self) -> Vec<VehicleLocation> {
        self.telemetry.read().await.data.vehicles.clone()
    }

    pub async fn forms(&self) -> Vec<InspectionForm> {
        self.forms.read().await.data.clone()
    }

    pub async fn photos(&self) -> Vec<StormPhoto> {
        self.photos.read().await.data.clone()
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let telemetry = self.telemetry().await;
        DashboardSnapshot {
            vehicles: telemetry.vehicles,
            alerts: telemetry.alerts,
            forms: self.forms().await,
            photos: self.photos().await,
        }
    }

    /// Stats from current contents; never cached
    pub async fn stats(&self, now: DateTime<Utc>) -> DashboardStats {
        let telemetry = self.telemetry.read().await;
        let forms = self.forms.read().await;
        let photos = self.photos.read().await;
        alert_engine::compute_stats(
            &telemetry.data.vehicles,
            &telemetry.data.alerts,
            &forms.data,
            &photos.data,
            now,
        )
    }

    /// Origin and last update of one slice
    pub async fn freshness(&self, source: SourceKind) -> (Option<DataOrigin>, Option<DateTime<Utc>>) {
        match source {
            SourceKind::Telemetry => {
                let s = self.telemetry.read().await;
                (s.origin.clone(), s.updated_at)
            }
            SourceKind::Forms => {
                let s = self.forms.read().await;
                (s.origin.clone(), s.updated_at)
            }
            SourceKind::Photos => {
                let s = self.photos.read().await;
                (s.origin.clone(), s.updated_at)
            }
        }
    }
}
