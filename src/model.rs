//! Data model for devices, vendor operations and poll snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Operation types that can carry a usable location
pub const LOCATION_OPERATION_TYPES: [&str; 3] = ["LOCATION", "LASTLOC", "OFFLINE_LOC"];

/// Operation type reporting connectivity and battery state
pub const OP_CHECK_CONNECTION: &str = "CHECK_CONNECTION";

/// Operation requested in active mode to force a fresh location
pub const OP_CHECK_CONNECTION_WITH_LOCATION: &str = "CHECK_CONNECTION_WITH_LOCATION";

/// Vendor sub-type marking two-part devices (earbuds) that report one
/// location per bud
pub const SUB_TYPE_DUAL: &str = "CANAL2";

/// A registered device from the user's SmartThings Find account.
///
/// Built once per polling session from the device-list response and not
/// mutated during polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Vendor device id (`dvceID`)
    pub device_id: String,
    /// Display name, HTML-entity decoded
    pub display_name: String,
    /// Vendor model id
    pub model_id: String,
    /// Device type code, e.g. "TAG" for SmartTags
    pub device_type: String,
    /// Owning user id (`usrId`), required by the location-refresh request
    pub owner_id: String,
    /// Sub-unit keys for multi-part hardware, e.g. ["left", "right"]
    pub sub_unit_keys: Vec<String>,
    /// Colored icon URL, if the vendor provided one
    pub icon_url: Option<String>,
}

/// A single vendor-reported event for one device poll.
///
/// The vendor payload is loosely structured: coordinate and uncertainty
/// fields arrive as strings or numbers depending on device firmware, and
/// `encLocation` doubles as a plain location container and as a map of
/// sub-unit key to location. Fields are therefore kept as raw JSON values
/// and interpreted by the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Operation type (`oprnType`): LOCATION, LASTLOC, OFFLINE_LOC,
    /// CHECK_CONNECTION, ...
    #[serde(rename = "oprnType")]
    pub oprn_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,

    #[serde(
        default,
        rename = "horizontalUncertainty",
        skip_serializing_if = "Option::is_none"
    )]
    pub horizontal_uncertainty: Option<Value>,

    #[serde(
        default,
        rename = "verticalUncertainty",
        skip_serializing_if = "Option::is_none"
    )]
    pub vertical_uncertainty: Option<Value>,

    /// Extra attributes; plain locations carry their UTC date here as
    /// `gpsUtcDt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,

    /// Either a location container (with `encrypted`, `gpsUtcDt`, coords)
    /// or a sub-unit map (sub-unit key -> location object)
    #[serde(
        default,
        rename = "encLocation",
        skip_serializing_if = "Option::is_none"
    )]
    pub enc_location: Option<Map<String, Value>>,

    /// Battery reading on CHECK_CONNECTION operations; textual level or
    /// numeric percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<Value>,

    /// Anything else the vendor sent, retained for diagnostics
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Operation {
    /// Whether this operation type can carry a usable location
    pub fn is_location_operation(&self) -> bool {
        LOCATION_OPERATION_TYPES.contains(&self.oprn_type.as_str())
    }
}

/// The single best location derived from one device's operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Combined horizontal/vertical uncertainty, GPS-accuracy compatible
    pub accuracy: Option<f64>,
    /// UTC timestamp of the contributing operation
    pub timestamp: DateTime<Utc>,
}

/// Per-device outcome of one polling cycle.
///
/// Created fresh every cycle and never mutated afterwards; the next cycle's
/// snapshot supersedes it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub display_name: String,
    /// Whether the service returned usable data for this device
    pub update_success: bool,
    /// Whether a location with coordinates was resolved
    pub location_found: bool,
    pub location: Option<ResolvedLocation>,
    /// The winning operation, when one was accepted
    pub used_operation: Option<Operation>,
    /// Full ordered operation list as received, retained for battery
    /// extraction and sub-unit lookups even when resolution failed
    pub operations: Vec<Operation>,
}

impl DeviceSnapshot {
    /// Synthetic snapshot for a device whose fetch failed entirely
    pub fn failed(device: &Device) -> Self {
        Self {
            device_id: device.device_id.clone(),
            display_name: device.display_name.clone(),
            update_success: false,
            location_found: false,
            location: None,
            used_operation: None,
            operations: Vec::new(),
        }
    }
}

/// All per-device results of one completed polling cycle, keyed by device id
pub type PollSnapshot = HashMap<String, DeviceSnapshot>;

/// Outcome of one coordinator cycle, checked explicitly by the caller
/// instead of raising through layers.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Every device was processed; per-device failures are recorded inside
    /// the snapshot
    Success(PollSnapshot),
    /// The cycle failed for a recoverable reason; the host may retry on its
    /// own schedule
    PartialFailure(String),
    /// The session is no longer valid; the user must re-authenticate.
    /// Supersedes all per-device results of the cycle.
    AuthFailure(String),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success(_))
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, CycleOutcome::AuthFailure(_))
    }
}

/// Map a vendor textual battery level to a percentage
pub fn battery_level_from_label(label: &str) -> Option<i64> {
    match label {
        "LEVEL_EMPTY" => Some(0),
        "LEVEL_LOW" => Some(15),
        "LEVEL_MID" => Some(50),
        "LEVEL_HIGH" => Some(80),
        "LEVEL_FULL" => Some(100),
        _ => None,
    }
}

/// Read a vendor value as f64, accepting both JSON numbers and numeric
/// strings (the payload mixes them freely)
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a vendor boolean, accepting both JSON booleans and "true"/"false"
/// strings
pub fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_deserializes_from_vendor_payload() {
        let raw = serde_json::json!({
            "oprnType": "LOCATION",
            "latitude": "48.137154",
            "longitude": 11.576124,
            "horizontalUncertainty": "12.0",
            "extra": {"gpsUtcDt": "20240115103045"},
            "oprnStatus": "DONE"
        });
        let op: Operation = serde_json::from_value(raw).unwrap();
        assert_eq!(op.oprn_type, "LOCATION");
        assert_eq!(value_as_f64(op.latitude.as_ref().unwrap()), Some(48.137154));
        assert_eq!(value_as_f64(op.longitude.as_ref().unwrap()), Some(11.576124));
        assert!(op.is_location_operation());
        assert_eq!(op.rest.get("oprnStatus").unwrap(), "DONE");
    }

    #[test]
    fn battery_label_table() {
        assert_eq!(battery_level_from_label("LEVEL_LOW"), Some(15));
        assert_eq!(battery_level_from_label("LEVEL_FULL"), Some(100));
        assert_eq!(battery_level_from_label("LEVEL_UNKNOWN"), None);
    }

    #[test]
    fn lenient_value_parsing() {
        assert_eq!(value_as_f64(&serde_json::json!("3.5")), Some(3.5));
        assert_eq!(value_as_f64(&serde_json::json!(4)), Some(4.0));
        assert_eq!(value_as_f64(&serde_json::json!("garbage")), None);
        assert!(value_as_bool(&serde_json::json!(true)));
        assert!(value_as_bool(&serde_json::json!("true")));
        assert!(!value_as_bool(&serde_json::json!("0")));
    }
}
