//! Shared models and types
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Why an adapter answered with its sample payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No credential configured, no request attempted
    NotConfigured,
    /// Transport, timeout, auth or decode failure
    UpstreamError(String),
}

/// Where a payload came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Fallback(FallbackReason),
}

impl DataOrigin {
    pub fn is_live(&self) -> bool {
        matches!(self, DataOrigin::Live)
    }
}

/// Normalized adapter result. Adapters never return an error to their caller;
/// failures come back as fallback data tagged with the reason.
#[derive(Debug, Clone)]
pub struct SourceResult<T> {
    pub data: T,
    pub origin: DataOrigin,
}

impl<T> SourceResult<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            origin: DataOrigin::Live,
        }
    }

    pub fn fallback(data: T, reason: FallbackReason) -> Self {
        Self {
            data,
            origin: DataOrigin::Fallback(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        !self.origin.is_live()
    }
}

/// Per-source freshness info reported by the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub configured: bool,
    pub origin: Option<DataOrigin>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub viewers: u64,
    pub sources: SourcesHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesHealth {
    pub telemetry: SourceHealth,
    pub forms: SourceHealth,
    pub photos: SourceHealth,
    #[serde(rename = "displayControl")]
    pub display_control: SourceHealth,
}
