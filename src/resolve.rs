//! Location resolution over raw vendor operation lists
//!
//! A poll for one device returns a loosely-structured list of operations,
//! often with several locations of different ages (especially phones). The
//! resolver walks the whole list and keeps the most recent usable one;
//! order of the list is meaningless, only each operation's own timestamp
//! counts. Encrypted locations are skipped: the only encrypted locations
//! observed in the wild were older than the plain ones, so decryption is
//! not worth supporting.

use crate::model::{
    battery_level_from_label, value_as_bool, value_as_f64, Operation, ResolvedLocation,
    OP_CHECK_CONNECTION,
};
use crate::time::{combine_accuracy, parse_find_timestamp};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Result of resolving one device's operation list
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Best location, present when at least one candidate was accepted
    pub location: Option<ResolvedLocation>,
    /// The operation that contributed the winning timestamp
    pub used_operation: Option<Operation>,
    /// True when an accepted candidate carried at least one coordinate
    pub location_found: bool,
}

fn field_f64(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(value_as_f64)
}

fn field_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Select the single most recent usable location from `operations`.
///
/// Candidates are LOCATION, LASTLOC and OFFLINE_LOC operations. A candidate
/// only replaces the incumbent when its timestamp is strictly newer; on a
/// tie the earlier-evaluated operation wins. Malformed or missing
/// timestamps are logged and skipped, never fatal.
pub fn resolve_location(device_name: &str, operations: &[Operation]) -> Resolution {
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;
    let mut accuracy: Option<f64> = None;
    let mut best_date: Option<DateTime<Utc>> = None;
    let mut used_operation: Option<&Operation> = None;
    let mut location_found = false;

    for op in operations.iter().filter(|op| op.is_location_operation()) {
        if let Some(raw_latitude) = &op.latitude {
            // Plain location: the UTC date lives in the extra attributes.
            let Some(raw_date) = op
                .extra
                .as_ref()
                .and_then(|extra| field_str(extra, "gpsUtcDt"))
            else {
                error!(
                    "[{device_name}] No UTC date found for operation '{}', this should not happen",
                    op.oprn_type
                );
                continue;
            };
            let date = match parse_find_timestamp(raw_date) {
                Ok(date) => date,
                Err(err) => {
                    warn!("[{device_name}] Skipping operation '{}': {err}", op.oprn_type);
                    continue;
                }
            };
            if best_date.is_some_and(|best| best >= date) {
                debug!(
                    "[{device_name}] Ignoring location older than the previous ({})",
                    op.oprn_type
                );
                continue;
            }

            let mut has_coordinates = false;
            if let Some(value) = value_as_f64(raw_latitude) {
                latitude = Some(value);
                has_coordinates = true;
            }
            if let Some(value) = op.longitude.as_ref().and_then(value_as_f64) {
                longitude = Some(value);
                has_coordinates = true;
            }
            if has_coordinates {
                location_found = true;
            } else {
                warn!(
                    "[{device_name}] Found no coordinates in operation '{}'",
                    op.oprn_type
                );
            }

            accuracy = combine_accuracy(
                op.horizontal_uncertainty.as_ref().and_then(value_as_f64),
                op.vertical_uncertainty.as_ref().and_then(value_as_f64),
            );
            best_date = Some(date);
            used_operation = Some(op);
        } else if let Some(loc) = &op.enc_location {
            if loc.get("encrypted").is_some_and(value_as_bool) {
                info!(
                    "[{device_name}] Ignoring encrypted location ({})",
                    op.oprn_type
                );
                continue;
            }
            let Some(raw_date) = field_str(loc, "gpsUtcDt") else {
                info!(
                    "[{device_name}] Ignoring location with missing date ({})",
                    op.oprn_type
                );
                continue;
            };
            let date = match parse_find_timestamp(raw_date) {
                Ok(date) => date,
                Err(err) => {
                    warn!("[{device_name}] Skipping operation '{}': {err}", op.oprn_type);
                    continue;
                }
            };
            if best_date.is_some_and(|best| best >= date) {
                debug!(
                    "[{device_name}] Ignoring location older than the previous ({})",
                    op.oprn_type
                );
                continue;
            }

            let mut has_coordinates = false;
            if let Some(value) = field_f64(loc, "latitude") {
                latitude = Some(value);
                has_coordinates = true;
            }
            if let Some(value) = field_f64(loc, "longitude") {
                longitude = Some(value);
                has_coordinates = true;
            }
            if has_coordinates {
                location_found = true;
            } else {
                warn!(
                    "[{device_name}] Found no coordinates in operation '{}'",
                    op.oprn_type
                );
            }

            accuracy = combine_accuracy(
                field_f64(loc, "horizontalUncertainty"),
                field_f64(loc, "verticalUncertainty"),
            );
            best_date = Some(date);
            used_operation = Some(op);
        }
    }

    match used_operation {
        Some(op) => {
            debug!("[{device_name}] Used operation: {}", op.oprn_type);
            Resolution {
                location: best_date.map(|timestamp| ResolvedLocation {
                    latitude,
                    longitude,
                    accuracy,
                    timestamp,
                }),
                used_operation: Some(op.clone()),
                location_found,
            }
        }
        None => {
            warn!("[{device_name}] No usable location-operation found");
            Resolution::default()
        }
    }
}

/// Extract the location of one physical sub-unit (e.g. a single earbud).
///
/// The first operation whose `encLocation` map carries `sub_unit_key` wins;
/// sub-unit operations are unique per poll, so no recency comparison is
/// done across matches.
pub fn resolve_sub_location(
    operations: &[Operation],
    sub_unit_key: &str,
) -> Option<(Operation, ResolvedLocation)> {
    if sub_unit_key.is_empty() {
        return None;
    }
    for op in operations {
        let Some(loc) = op
            .enc_location
            .as_ref()
            .and_then(|enc| enc.get(sub_unit_key))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let timestamp = match field_str(loc, "gpsUtcDt").map(parse_find_timestamp) {
            Some(Ok(timestamp)) => timestamp,
            _ => {
                warn!("Sub-unit '{sub_unit_key}' location has no valid date, ignoring");
                return None;
            }
        };
        let location = ResolvedLocation {
            latitude: field_f64(loc, "latitude"),
            longitude: field_f64(loc, "longitude"),
            accuracy: combine_accuracy(
                field_f64(loc, "horizontalUncertainty"),
                field_f64(loc, "verticalUncertainty"),
            ),
            timestamp,
        };
        return Some((op.clone(), location));
    }
    None
}

/// Extract the battery level from a device's operation list.
///
/// The first CHECK_CONNECTION operation carrying a battery field decides:
/// known textual levels map through the fixed table, anything else is
/// parsed as an integer percentage.
pub fn battery_level(device_name: &str, operations: &[Operation]) -> Option<i64> {
    for op in operations {
        if op.oprn_type != OP_CHECK_CONNECTION {
            continue;
        }
        let Some(raw) = &op.battery else { continue };

        if let Some(label) = raw.as_str() {
            if let Some(level) = battery_level_from_label(label) {
                return Some(level);
            }
            if let Ok(level) = label.trim().parse::<i64>() {
                return Some(level);
            }
        } else if let Some(level) = raw.as_i64() {
            return Some(level);
        }

        warn!("[{device_name}] Received invalid battery level: {raw}");
        return None;
    }
    None
}
