//! DashboardService - Operator Query Surface
//!
//! Stats, current vehicles and forms, pushed form intake and display
//! activation. HTTP handlers call into this and nothing else.

use crate::alert_engine::DashboardStats;
use crate::display_control::{ActivationResult, DisplayActivator, DisplayDevice};
use crate::error::{Error, Result};
use crate::fleet_telemetry::VehicleLocation;
use crate::inspection_client::InspectionForm;
use crate::polling_orchestrator::PollingOrchestrator;
use crate::realtime_hub::{HubMessage, RealtimeHub};
use crate::snapshot_store::DashboardStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub struct DashboardService {
    store: Arc<DashboardStore>,
    hub: Arc<RealtimeHub>,
    polling: Arc<PollingOrchestrator>,
    activator: Arc<DisplayActivator>,
}

impl DashboardService {
    pub fn new(
        store: Arc<DashboardStore>,
        hub: Arc<RealtimeHub>,
        polling: Arc<PollingOrchestrator>,
        activator: Arc<DisplayActivator>,
    ) -> Self {
        Self {
            store,
            hub,
            polling,
            activator,
        }
    }

    pub async fn stats(&self) -> DashboardStats {
        self.store.stats(Utc::now()).await
    }

    /// Current vehicles; `refresh` fetches first
    pub async fn vehicles(&self, refresh: bool) -> Vec<VehicleLocation> {
        if refresh {
            let outcome = self.polling.refresh_telemetry().await;
            tracing::debug!(outcome = ?outcome, "On-demand telemetry refresh");
        }
        self.store.vehicles().await
    }

    pub async fn forms(&self) -> Vec<InspectionForm> {
        self.store.forms().await
    }

    pub fn displays(&self) -> &[DisplayDevice] {
        self.activator.displays()
    }

    /// Store a pushed form at the head of the list and tell every viewer
    pub async fn submit_form(&self, fields: Value) -> Result<InspectionForm> {
        let Value::Object(fields) = fields else {
            return Err(Error::Validation("form body must be a JSON object".to_string()));
        };

        let form = InspectionForm::from_submission(fields, Utc::now())?;
        self.store.prepend_form(form.clone()).await;

        let report = self
            .hub
            .broadcast(HubMessage::NewSitefotosForm { form: form.clone() })
            .await;
        tracing::info!(form_id = %form.id, viewers = report.delivered, "Form submitted to dashboard");

        Ok(form)
    }

    pub async fn activate_display(&self, display_index: &str) -> Result<ActivationResult> {
        self.activator.activate_param(display_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_control::{DisplayControlClient, DisplayControlConfig};
    use crate::fleet_telemetry::{FleetTelemetryClient, TelemetryConfig};
    use crate::inspection_client::{InspectionClient, InspectionConfig};
    use crate::polling_orchestrator::PollingConfig;
    use serde_json::json;

    fn service() -> (DashboardService, Arc<RealtimeHub>) {
        let store = Arc::new(DashboardStore::new());
        let hub = Arc::new(RealtimeHub::new(store.clone()));
        let polling = Arc::new(PollingOrchestrator::new(
            store.clone(),
            hub.clone(),
            Arc::new(FleetTelemetryClient::new(TelemetryConfig::unconfigured("http://127.0.0.1:1")).unwrap()),
            Arc::new(InspectionClient::new(InspectionConfig::unconfigured("http://127.0.0.1:1")).unwrap()),
            PollingConfig::default(),
        ));
        let control = Arc::new(
            DisplayControlClient::new(DisplayControlConfig::unconfigured("http://127.0.0.1:1")).unwrap(),
        );
        let activator = Arc::new(DisplayActivator::new(
            control,
            DisplayDevice::defaults_from_env(),
            "http://dash.local:3000",
        ));
        (DashboardService::new(store, hub.clone(), polling, activator), hub)
    }

    #[tokio::test]
    async fn test_submit_form_prepends_and_broadcasts() {
        let (svc, hub) = service();
        svc.polling.tick_inspection().await;
        let (_a, mut rx_a) = hub.register().await;
        let (_b, mut rx_b) = hub.register().await;

        let form = svc
            .submit_form(json!({"formType": "Leak", "site": "Bldg A"}))
            .await
            .unwrap();

        assert!(form.id.starts_with("SF-"));
        let forms = svc.forms().await;
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0], form);

        for rx in [&mut rx_a, &mut rx_b] {
            let initial: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(initial["type"], "INITIAL_DATA");
            let pushed: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(pushed["type"], "NEW_SITEFOTOS_FORM");
            assert_eq!(pushed["form"]["formType"], "Leak");
            assert_eq!(pushed["form"]["site"], "Bldg A");
            assert_eq!(pushed["form"]["id"], form.id.as_str());
            assert!(pushed["form"]["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn test_submit_keeps_fields_of_any_shape() {
        let (svc, hub) = service();
        let (_id, mut rx) = hub.register().await;

        let form = svc
            .submit_form(json!({
                "formType": "Leak",
                "site": "Bldg A",
                "location": "north lot",
                "status": null,
                "photos": "one.jpg"
            }))
            .await
            .unwrap();

        let forms = svc.forms().await;
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].id, form.id);
        assert_eq!(forms[0].site.as_deref(), Some("Bldg A"));

        rx.recv().await.unwrap();
        let pushed: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(pushed["type"], "NEW_SITEFOTOS_FORM");
        assert_eq!(pushed["form"]["location"], "north lot");
        assert_eq!(pushed["form"]["photos"], "one.jpg");
        assert!(pushed["form"]["status"].is_null());
    }

    #[tokio::test]
    async fn test_submit_non_object_rejected() {
        let (svc, _hub) = service();
        let err = svc.submit_form(json!(["not", "an", "object"])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(svc.forms().await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_follow_store() {
        let (svc, _hub) = service();
        assert_eq!(svc.stats().await.total_vehicles, 0);

        let vehicles = svc.vehicles(true).await;
        assert_eq!(vehicles.len(), 2);

        let stats = svc.stats().await;
        assert_eq!(stats.total_vehicles, 2);
        assert_eq!(stats.stationary_vehicles, 1);
        assert_eq!(stats.active_alert_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_display_simulated_without_token() {
        let (svc, _hub) = service();
        let result = svc.activate_display("1").await.unwrap();
        assert!(result.simulated);
        assert_eq!(result.display, "Display 2");
        assert_eq!(result.dashboard_url, "http://dash.local:3000/dashboard?display=1");

        let err = svc.activate_display("99").await.unwrap_err();
        assert_eq!(err.to_string(), "Display 99 not found");
    }
}
