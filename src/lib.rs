//! Storm Response Dashboard Library
//!
//! Aggregates fleet telemetry, field inspections and display control into
//! one live feed for operators.
//!
//! ## Components
//!
//! 1. FleetTelemetry - vehicle location adapter
//! 2. InspectionClient - forms/photos adapter
//! 3. DisplayControl - display command adapter + activation sequence
//! 4. AlertEngine - stationary detection, alerts, stats
//! 5. SnapshotStore - last known good state per source
//! 6. PollingOrchestrator - independent telemetry/inspection schedules
//! 7. RealtimeHub - viewer push distribution
//! 8. DashboardService - operator query surface
//! 9. WebAPI - REST/WebSocket endpoints

pub mod alert_engine;
pub mod dashboard_service;
pub mod display_control;
pub mod error;
pub mod fleet_telemetry;
pub mod inspection_client;
pub mod models;
pub mod polling_orchestrator;
pub mod realtime_hub;
pub mod snapshot_store;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
