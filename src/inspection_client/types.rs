//! Inspection forms / photos types

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Default upstream endpoint
pub const DEFAULT_INSPECTION_URL: &str = "https://api.sitefotos.com";

/// Prefix for locally assigned form ids
pub const FORM_ID_PREFIX: &str = "SF-";

/// Inspection adapter configuration
#[derive(Debug, Clone)]
pub struct InspectionConfig {
    pub base_url: String,
    /// Bearer token; `None` means "not configured"
    pub api_key: Option<String>,
    /// Sent as `Project-ID` header
    pub project_id: Option<String>,
    pub timeout: Duration,
}

impl InspectionConfig {
    /// Read from environment
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SITEFOTOS_API_URL")
                .unwrap_or_else(|_| DEFAULT_INSPECTION_URL.to_string()),
            api_key: std::env::var("SITEFOTOS_API_KEY").ok().filter(|k| !k.is_empty()),
            project_id: std::env::var("SITEFOTOS_PROJECT_ID").ok(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn unconfigured(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            project_id: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Form status
///
/// Statuses other than `Normal` / `Urgent` are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormStatus {
    #[default]
    Normal,
    Urgent,
    Other(String),
}

impl From<String> for FormStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Normal" => FormStatus::Normal,
            "Urgent" => FormStatus::Urgent,
            _ => FormStatus::Other(s),
        }
    }
}

impl From<FormStatus> for String {
    fn from(s: FormStatus) -> Self {
        match s {
            FormStatus::Normal => "Normal".to_string(),
            FormStatus::Urgent => "Urgent".to_string(),
            FormStatus::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Field inspection form
///
/// Only `id` and `timestamp` are required. A known field whose value has an
/// unexpected shape is kept untouched in `extra`, as is every field the
/// dashboard does not interpret; `extra` is serialized back at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct InspectionForm {
    pub id: String,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FormStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(rename = "photos", skip_serializing_if = "Option::is_none")]
    pub photo_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InspectionForm {
    pub fn is_urgent(&self) -> bool {
        self.status == Some(FormStatus::Urgent)
    }

    /// Build a stored form from pushed fields.
    ///
    /// The generated id and timestamp always replace whatever the sender put
    /// in `id` / `timestamp`; every other field is accepted as sent.
    pub fn from_submission(mut fields: Map<String, Value>, now: DateTime<Utc>) -> crate::Result<Self> {
        fields.insert(
            "id".to_string(),
            Value::String(format!("{}{}", FORM_ID_PREFIX, now.timestamp_millis())),
        );
        fields.insert("timestamp".to_string(), serde_json::to_value(now)?);

        Self::try_from(fields).map_err(|e| crate::Error::Validation(format!("invalid form fields: {}", e)))
    }
}

impl TryFrom<Map<String, Value>> for InspectionForm {
    type Error = String;

    fn try_from(mut fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err("form has no id".to_string()),
        };
        let submitted_at = fields
            .remove("timestamp")
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
            .ok_or_else(|| format!("form {} has no valid timestamp", id))?;

        Ok(Self {
            id,
            submitted_at,
            form_type: take_typed(&mut fields, "formType"),
            site: take_typed(&mut fields, "site"),
            status: take_typed(&mut fields, "status"),
            submitted_by: take_typed(&mut fields, "submittedBy"),
            photo_refs: take_typed(&mut fields, "photos"),
            details: take_typed(&mut fields, "details"),
            location: take_typed(&mut fields, "location"),
            extra: fields,
        })
    }
}

/// Move `key` out of `fields` if it decodes as `T`; otherwise leave it there
fn take_typed<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let typed = T::deserialize(fields.get(key)?).ok()?;
    fields.remove(key);
    Some(typed)
}

/// Storm damage photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StormPhoto {
    pub id: String,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
}

// ========================================
// Upstream wire format
// ========================================

/// `forms: null` and a missing key both mean no forms. Records are kept
/// raw so one bad record does not sink the batch.
#[derive(Debug, Deserialize)]
pub(crate) struct FormsResponse {
    #[serde(default)]
    pub forms: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotosResponse {
    #[serde(default)]
    pub photos: Option<Vec<Value>>,
}
