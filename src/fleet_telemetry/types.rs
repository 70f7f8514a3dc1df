//! Fleet telemetry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default upstream endpoint
pub const DEFAULT_TELEMETRY_URL: &str = "https://api.samsara.com";

/// Telemetry adapter configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// API base URL
    pub base_url: String,
    /// Bearer token; `None` means "not configured"
    pub api_key: Option<String>,
    /// Fleet identifier (informational)
    pub fleet_id: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl TelemetryConfig {
    /// Read from environment
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SAMSARA_API_URL")
                .unwrap_or_else(|_| DEFAULT_TELEMETRY_URL.to_string()),
            api_key: std::env::var("SAMSARA_API_KEY").ok().filter(|k| !k.is_empty()),
            fleet_id: std::env::var("SAMSARA_FLEET_ID").ok(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Unconfigured config pointing at `base_url`
    pub fn unconfigured(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            fleet_id: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Normalized vehicle position
///
/// Replaced wholesale on every poll. Whether a vehicle is stationary is
/// derived from `last_report_time` at read time, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocation {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub last_report_time: Option<DateTime<Utc>>,
}

impl VehicleLocation {
    /// Name shown to operators, `Vehicle {id}` when unnamed
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Vehicle {}", self.id),
        }
    }
}

// ========================================
// Upstream wire format
// ========================================

/// `GET /fleet/vehicles/locations` response; `data: null` means no vehicles
#[derive(Debug, Deserialize)]
pub(crate) struct LocationsResponse {
    #[serde(default)]
    pub data: Option<Vec<WireVehicle>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVehicle {
    pub id: WireId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<WireLocation>,
}

/// Upstream ids arrive as strings or numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    /// Unparseable times are treated as unknown
    #[serde(default, deserialize_with = "lenient_time")]
    pub time: Option<DateTime<Utc>>,
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

impl From<WireVehicle> for VehicleLocation {
    fn from(v: WireVehicle) -> Self {
        let location = v.location;
        Self {
            id: v.id.into_string(),
            name: v.name,
            latitude: location.as_ref().and_then(|l| l.latitude),
            longitude: location.as_ref().and_then(|l| l.longitude),
            address: location.as_ref().and_then(|l| l.address.clone()),
            last_report_time: location.and_then(|l| l.time),
        }
    }
}
