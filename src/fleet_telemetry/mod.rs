//! FleetTelemetry - Vehicle Location Adapter
//!
//! ## Responsibilities
//!
//! - Fetch current vehicle locations from the fleet telemetry API
//! - Normalize the upstream shape into `VehicleLocation`
//! - Answer with sample vehicles when unconfigured or unreachable
//!
//! `fetch_vehicle_locations` never fails. Errors are logged at the boundary
//! and turned into fallback data.

pub mod types;

use crate::error::{Error, Result};
use crate::models::{FallbackReason, SourceResult};
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use reqwest::Client;
use tracing::{debug, info, warn};

pub use types::*;

/// Fleet telemetry client
pub struct FleetTelemetryClient {
    http_client: Client,
    config: TelemetryConfig,
}

impl FleetTelemetryClient {
    /// Create new client
    pub fn new(config: TelemetryConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Fetch vehicle locations, falling back to sample data on any failure
    pub async fn fetch_vehicle_locations(&self) -> SourceResult<Vec<VehicleLocation>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("Telemetry API key not configured - using sample vehicles");
            return SourceResult::fallback(sample_vehicles(), FallbackReason::NotConfigured);
        };

        match self.request_locations(api_key).await {
            Ok(vehicles) => {
                info!(vehicle_count = vehicles.len(), "Retrieved vehicles from telemetry API");
                SourceResult::live(vehicles)
            }
            Err(e) => {
                warn!(error = %e, "Telemetry fetch failed - using sample vehicles");
                SourceResult::fallback(
                    sample_vehicles(),
                    FallbackReason::UpstreamError(e.to_string()),
                )
            }
        }
    }

    async fn request_locations(&self, api_key: &str) -> Result<Vec<VehicleLocation>> {
        let url = format!(
            "{}/fleet/vehicles/locations",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self.http_client.get(&url).bearer_auth(api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("telemetry API returned {}", status)));
        }

        let body: LocationsResponse = response.json().await?;
        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(VehicleLocation::from)
            .collect())
    }
}

/// Sample vehicles: one reporting now, one silent for 45 minutes
pub fn sample_vehicles() -> Vec<VehicleLocation> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    vec![
        VehicleLocation {
            id: "12345".to_string(),
            name: Some("Service Truck 101".to_string()),
            latitude: Some(40.7128 + rng.gen_range(-0.05..0.05)),
            longitude: Some(-74.0060 + rng.gen_range(-0.05..0.05)),
            address: Some("Downtown Area".to_string()),
            last_report_time: Some(now),
        },
        VehicleLocation {
            id: "12346".to_string(),
            name: Some("Response Van 202".to_string()),
            latitude: Some(40.7282 + rng.gen_range(-0.05..0.05)),
            longitude: Some(-74.0776 + rng.gen_range(-0.05..0.05)),
            address: Some("Northside District".to_string()),
            last_report_time: Some(now - ChronoDuration::minutes(45)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataOrigin;
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use serde_json::json;
    use std::time::Duration;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn configured(base_url: String) -> TelemetryConfig {
        TelemetryConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            fleet_id: None,
            timeout: Duration::from_millis(300),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_returns_sample_without_request() {
        // Nothing listens here; an attempted request would surface as UpstreamError
        let client = FleetTelemetryClient::new(TelemetryConfig::unconfigured("http://127.0.0.1:1")).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert_eq!(result.origin, DataOrigin::Fallback(FallbackReason::NotConfigured));
        assert_eq!(result.data.len(), 2);
        assert_eq!(result.data[0].name.as_deref(), Some("Service Truck 101"));
        assert!(result.data.iter().all(|v| v.last_report_time.is_some()));
    }

    #[tokio::test]
    async fn test_live_fetch_normalizes_and_sends_bearer() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer test-key" {
                    return Json(json!({"data": []}));
                }
                Json(json!({"data": [
                    {"id": "7", "name": "Crane 7", "location": {
                        "latitude": 40.0, "longitude": -74.0,
                        "address": "Pier 4", "time": "2026-03-01T12:00:00Z"
                    }}
                ]}))
            }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert_eq!(result.origin, DataOrigin::Live);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].name.as_deref(), Some("Crane 7"));
        assert_eq!(result.data[0].address.as_deref(), Some("Pier 4"));
    }

    #[tokio::test]
    async fn test_malformed_body_falls_back() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|| async { Json(json!({"data": "not-a-list"})) }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert!(matches!(
            result.origin,
            DataOrigin::Fallback(FallbackReason::UpstreamError(_))
        ));
        assert_eq!(result.data.len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"data": []}))
            }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn test_error_status_falls_back() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        match result.origin {
            DataOrigin::Fallback(FallbackReason::UpstreamError(msg)) => assert!(msg.contains("401")),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_data_is_live_empty_fleet() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|| async { Json(json!({"data": null})) }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert_eq!(result.origin, DataOrigin::Live);
        assert!(result.data.is_empty());
    }

    #[tokio::test]
    async fn test_bad_report_time_keeps_batch_live() {
        let router = Router::new().route(
            "/fleet/vehicles/locations",
            get(|| async {
                Json(json!({"data": [
                    {"id": "1", "name": "Crane 1", "location": {"latitude": 40.0, "longitude": -74.0, "time": "2026-03-01 12:00"}},
                    {"id": "2", "name": "Crane 2", "location": {"latitude": 40.1, "longitude": -74.1, "time": "2026-03-01T12:00:00Z"}}
                ]}))
            }),
        );
        let base = spawn_upstream(router).await;

        let client = FleetTelemetryClient::new(configured(base)).unwrap();
        let result = client.fetch_vehicle_locations().await;

        assert_eq!(result.origin, DataOrigin::Live);
        let names: Vec<String> = result.data.iter().map(|v| v.display_name()).collect();
        assert_eq!(names, vec!["Crane 1", "Crane 2"]);
        assert!(result.data[0].last_report_time.is_none());
        assert!(!crate::alert_engine::is_stationary(&result.data[0], chrono::Utc::now()));
    }
}
