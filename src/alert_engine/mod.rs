//! AlertEngine - Derived State
//!
//! Pure functions over the current snapshot. Nothing here keeps state
//! between cycles: the alert set is rebuilt from scratch every time, so a
//! vehicle that stays put raises a fresh alert on every telemetry cycle.

use crate::fleet_telemetry::VehicleLocation;
use crate::inspection_client::{InspectionForm, StormPhoto};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes without a report before a vehicle counts as stationary
pub const STATIONARY_THRESHOLD_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    StationaryVehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
}

/// Geofence alert derived from one telemetry cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceAlert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub subject_name: String,
    pub duration_since_last_movement: String,
    pub message: String,
}

/// Aggregate counts for the stats panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub stationary_vehicles: usize,
    pub active_alert_count: usize,
    pub total_forms: usize,
    pub urgent_form_count: usize,
    pub recent_photo_count: usize,
}

/// Stationary iff a report time exists and is more than 30 minutes old
pub fn is_stationary(vehicle: &VehicleLocation, now: DateTime<Utc>) -> bool {
    match vehicle.last_report_time {
        Some(last) => now - last > Duration::minutes(STATIONARY_THRESHOLD_MINUTES),
        None => false,
    }
}

/// `"{h}h {m}m"` since last report, `"Unknown"` without one.
/// Report times in the future read as `"0h 0m"`.
pub fn stationary_duration(vehicle: &VehicleLocation, now: DateTime<Utc>) -> String {
    let Some(last) = vehicle.last_report_time else {
        return "Unknown".to_string();
    };
    let minutes = (now - last).num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// One warning per stationary vehicle
pub fn generate_alerts(vehicles: &[VehicleLocation], now: DateTime<Utc>) -> Vec<GeofenceAlert> {
    vehicles
        .iter()
        .filter(|v| is_stationary(v, now))
        .map(|v| {
            let name = v.display_name();
            let duration = stationary_duration(v, now);
            GeofenceAlert {
                alert_type: AlertType::StationaryVehicle,
                severity: AlertSeverity::Warning,
                message: format!("{} stationary for {}", name, duration),
                subject_name: name,
                duration_since_last_movement: duration,
            }
        })
        .collect()
}

/// Counts over the current snapshot
pub fn compute_stats(
    vehicles: &[VehicleLocation],
    alerts: &[GeofenceAlert],
    forms: &[InspectionForm],
    photos: &[StormPhoto],
    now: DateTime<Utc>,
) -> DashboardStats {
    DashboardStats {
        total_vehicles: vehicles.len(),
        stationary_vehicles: vehicles.iter().filter(|v| is_stationary(v, now)).count(),
        active_alert_count: alerts.len(),
        total_forms: forms.len(),
        urgent_form_count: forms.iter().filter(|f| f.is_urgent()).count(),
        recent_photo_count: photos.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection_client::{sample_forms, FormStatus};

    fn vehicle(id: &str, name: Option<&str>, reported: Option<DateTime<Utc>>) -> VehicleLocation {
        VehicleLocation {
            id: id.to_string(),
            name: name.map(str::to_string),
            latitude: Some(40.0),
            longitude: Some(-74.0),
            address: None,
            last_report_time: reported,
        }
    }

    #[test]
    fn test_forty_five_minutes_is_stationary() {
        let now = Utc::now();
        let v = vehicle("1", Some("Van"), Some(now - Duration::minutes(45)));
        assert!(is_stationary(&v, now));
        assert_eq!(stationary_duration(&v, now), "0h 45m");
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let now = Utc::now();
        let exactly = vehicle("1", None, Some(now - Duration::minutes(30)));
        assert!(!is_stationary(&exactly, now));

        let just_over = vehicle("2", None, Some(now - Duration::minutes(30) - Duration::seconds(1)));
        assert!(is_stationary(&just_over, now));
    }

    #[test]
    fn test_missing_report_time_never_stationary() {
        let now = Utc::now();
        let v = vehicle("1", Some("Ghost"), None);
        assert!(!is_stationary(&v, now));
        assert_eq!(stationary_duration(&v, now), "Unknown");
    }

    #[test]
    fn test_duration_hours_and_future_clamp() {
        let now = Utc::now();
        let v = vehicle("1", None, Some(now - Duration::minutes(135)));
        assert_eq!(stationary_duration(&v, now), "2h 15m");

        let future = vehicle("2", None, Some(now + Duration::minutes(5)));
        assert_eq!(stationary_duration(&future, now), "0h 0m");
        assert!(!is_stationary(&future, now));
    }

    #[test]
    fn test_alerts_match_stationary_count() {
        let now = Utc::now();
        let vehicles = vec![
            vehicle("1", Some("Truck 101"), Some(now)),
            vehicle("2", None, Some(now - Duration::minutes(90))),
            vehicle("3", Some("Van 202"), Some(now - Duration::minutes(31))),
            vehicle("4", Some("Unknown"), None),
        ];

        let alerts = generate_alerts(&vehicles, now);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].subject_name, "Vehicle 2");
        assert_eq!(alerts[0].message, "Vehicle 2 stationary for 1h 30m");
        assert_eq!(alerts[1].subject_name, "Van 202");
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Warning));

        // same input, same output
        assert_eq!(generate_alerts(&vehicles, now), alerts);
    }

    #[test]
    fn test_alert_wire_shape() {
        let now = Utc::now();
        let alerts = generate_alerts(&[vehicle("9", Some("Crane"), Some(now - Duration::hours(2)))], now);
        let value = serde_json::to_value(&alerts[0]).unwrap();
        assert_eq!(value["type"], "STATIONARY_VEHICLE");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["subjectName"], "Crane");
        assert_eq!(value["durationSinceLastMovement"], "2h 0m");
    }

    #[test]
    fn test_stats() {
        let now = Utc::now();
        let vehicles = vec![
            vehicle("1", None, Some(now)),
            vehicle("2", None, Some(now - Duration::minutes(45))),
        ];
        let alerts = generate_alerts(&vehicles, now);
        let mut forms = sample_forms();
        let mut normal = forms[0].clone();
        normal.status = Some(FormStatus::Normal);
        forms.push(normal);

        let stats = compute_stats(&vehicles, &alerts, &forms, &[], now);
        assert_eq!(
            stats,
            DashboardStats {
                total_vehicles: 2,
                stationary_vehicles: 1,
                active_alert_count: 1,
                total_forms: 2,
                urgent_form_count: 1,
                recent_photo_count: 0,
            }
        );
    }
}
