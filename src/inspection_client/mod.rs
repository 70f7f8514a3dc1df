//! InspectionClient - Field Inspection Forms & Photos Adapter
//!
//! ## Responsibilities
//!
//! - Fetch recent inspection forms and storm photos
//! - Answer with sample records when unconfigured or unreachable
//!
//! Both fetches share one HTTP client and the same fallback policy as the
//! telemetry adapter: errors never cross this boundary.

pub mod types;

use crate::error::{Error, Result};
use crate::models::{FallbackReason, SourceResult};
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub use types::*;

/// Inspection API client
pub struct InspectionClient {
    http_client: Client,
    config: InspectionConfig,
}

impl InspectionClient {
    /// Create new client
    pub fn new(config: InspectionConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Fetch recent forms
    pub async fn fetch_forms(&self) -> SourceResult<Vec<InspectionForm>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("Inspection API key not configured - using sample forms");
            return SourceResult::fallback(sample_forms(), FallbackReason::NotConfigured);
        };

        match self.get_json::<FormsResponse>("forms/recent", api_key).await {
            Ok(body) => {
                let forms: Vec<InspectionForm> = decode_records(body.forms.unwrap_or_default(), "form");
                info!(form_count = forms.len(), "Retrieved inspection forms");
                SourceResult::live(forms)
            }
            Err(e) => {
                warn!(error = %e, "Inspection forms fetch failed - using sample forms");
                SourceResult::fallback(sample_forms(), FallbackReason::UpstreamError(e.to_string()))
            }
        }
    }

    /// Fetch recent photos
    pub async fn fetch_photos(&self) -> SourceResult<Vec<StormPhoto>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return SourceResult::fallback(sample_photos(), FallbackReason::NotConfigured);
        };

        match self.get_json::<PhotosResponse>("photos/recent", api_key).await {
            Ok(body) => {
                let photos: Vec<StormPhoto> = decode_records(body.photos.unwrap_or_default(), "photo");
                info!(photo_count = photos.len(), "Retrieved storm photos");
                SourceResult::live(photos)
            }
            Err(e) => {
                warn!(error = %e, "Inspection photos fetch failed - using sample photos");
                SourceResult::fallback(sample_photos(), FallbackReason::UpstreamError(e.to_string()))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> Result<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let mut request = self.http_client.get(&url).bearer_auth(api_key);
        if let Some(project_id) = &self.config.project_id {
            request = request.header("Project-ID", project_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("inspection API {} returned {}", path, status)));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Decode records one by one; a record that does not fit is logged and skipped
fn decode_records<T: DeserializeOwned>(records: Vec<Value>, record_kind: &str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(record_kind, error = %e, "Skipping malformed upstream record");
                None
            }
        })
        .collect()
}

/// Sample form set: one urgent storm damage assessment
pub fn sample_forms() -> Vec<InspectionForm> {
    let now = Utc::now();
    vec![InspectionForm {
        id: format!("{}{}", FORM_ID_PREFIX, now.timestamp_millis()),
        submitted_at: now,
        form_type: Some("Storm Damage Assessment".to_string()),
        site: Some("Downtown Commercial District".to_string()),
        status: Some(FormStatus::Urgent),
        submitted_by: Some("John Smith - Crew A".to_string()),
        photo_refs: Some(vec!["/api/sitefotos/photo1.jpg".to_string()]),
        details: Some(json!({
            "damageType": "Fallen Trees & Power Lines",
            "severity": "High",
            "crewOnSite": true
        })),
        location: Some(GeoPoint {
            lat: 40.7128,
            lng: -74.0060,
        }),
        extra: Default::default(),
    }]
}

/// Sample photo set
pub fn sample_photos() -> Vec<StormPhoto> {
    let now = Utc::now();
    vec![StormPhoto {
        id: format!("P-{}", now.timestamp_millis()),
        submitted_at: now,
        url: "/api/sitefotos/storm-demo.jpg".to_string(),
        description: Some("Storm damage assessment photo".to_string()),
        submitted_by: Some("Demo User".to_string()),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataOrigin;
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use std::time::Duration;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn configured(base_url: String) -> InspectionConfig {
        InspectionConfig {
            base_url,
            api_key: Some("insp-key".to_string()),
            project_id: Some("proj-9".to_string()),
            timeout: Duration::from_millis(300),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_samples() {
        let client = InspectionClient::new(InspectionConfig::unconfigured("http://127.0.0.1:1")).unwrap();

        let forms = client.fetch_forms().await;
        assert_eq!(forms.origin, DataOrigin::Fallback(FallbackReason::NotConfigured));
        assert_eq!(forms.data.len(), 1);
        assert!(forms.data[0].is_urgent());
        assert!(forms.data[0].id.starts_with(FORM_ID_PREFIX));

        let photos = client.fetch_photos().await;
        assert_eq!(photos.origin, DataOrigin::Fallback(FallbackReason::NotConfigured));
        assert_eq!(photos.data.len(), 1);
    }

    #[tokio::test]
    async fn test_live_fetch_sends_project_header() {
        let router = Router::new()
            .route(
                "/forms/recent",
                get(|headers: HeaderMap| async move {
                    let project = headers
                        .get("project-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({"forms": [{
                        "id": "F-1",
                        "timestamp": "2026-03-01T12:00:00Z",
                        "formType": "Leak",
                        "site": project,
                        "status": "Normal",
                        "photos": []
                    }]}))
                }),
            )
            .route(
                "/photos/recent",
                get(|| async {
                    Json(json!({"photos": [
                        {"id": "P-1", "timestamp": "2026-03-01T12:00:00Z", "url": "/a.jpg"},
                        {"id": "P-2", "timestamp": "2026-03-01T12:05:00Z", "url": "/b.jpg"}
                    ]}))
                }),
            );
        let base = spawn_upstream(router).await;
        let client = InspectionClient::new(configured(base)).unwrap();

        let forms = client.fetch_forms().await;
        assert_eq!(forms.origin, DataOrigin::Live);
        assert_eq!(forms.data[0].site.as_deref(), Some("proj-9"));

        let photos = client.fetch_photos().await;
        assert_eq!(photos.origin, DataOrigin::Live);
        assert_eq!(photos.data.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_falls_back() {
        let client = InspectionClient::new(configured("http://127.0.0.1:1".to_string())).unwrap();

        let forms = client.fetch_forms().await;
        assert!(matches!(
            forms.origin,
            DataOrigin::Fallback(FallbackReason::UpstreamError(_))
        ));
        assert_eq!(forms.data[0].form_type.as_deref(), Some("Storm Damage Assessment"));
    }

    #[tokio::test]
    async fn test_null_lists_and_bad_records_stay_live() {
        let router = Router::new()
            .route(
                "/forms/recent",
                get(|| async {
                    Json(json!({"forms": [
                        {"id": "F-1", "timestamp": "2026-03-01T12:00:00Z", "status": "Urgent"},
                        {"id": "F-2", "formType": "Leak"},
                        {"id": "F-3", "timestamp": "2026-03-01T12:10:00Z", "location": "north lot"}
                    ]}))
                }),
            )
            .route("/photos/recent", get(|| async { Json(json!({"photos": null})) }));
        let base = spawn_upstream(router).await;
        let client = InspectionClient::new(configured(base)).unwrap();

        let forms = client.fetch_forms().await;
        assert_eq!(forms.origin, DataOrigin::Live);
        let ids: Vec<&str> = forms.data.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F-1", "F-3"]);
        assert!(forms.data[0].is_urgent());
        assert_eq!(forms.data[1].extra.get("location"), Some(&json!("north lot")));

        let photos = client.fetch_photos().await;
        assert_eq!(photos.origin, DataOrigin::Live);
        assert!(photos.data.is_empty());
    }
}
