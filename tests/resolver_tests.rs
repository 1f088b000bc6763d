//! Resolver behavior over raw vendor operation lists

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use serde_json::json;
use smartfind::resolve::{battery_level, resolve_location, resolve_sub_location};
use smartfind::time::parse_find_timestamp;

#[test]
fn newest_of_two_locations_wins() {
    let ops = vec![
        plain_location_op("LOCATION", 48.0, 11.0, "20240115103045"),
        plain_location_op("LOCATION", 49.0, 12.0, "20240115113045"),
    ];
    let resolution = resolve_location("test", &ops);
    assert!(resolution.location_found);
    let location = resolution.location.unwrap();
    assert_eq!(location.latitude, Some(49.0));
    assert_eq!(location.longitude, Some(12.0));
    assert_eq!(
        location.timestamp,
        Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 45).unwrap()
    );
}

#[test]
fn list_order_does_not_matter() {
    let newest_first = vec![
        plain_location_op("LASTLOC", 49.0, 12.0, "20240115113045"),
        plain_location_op("LOCATION", 48.0, 11.0, "20240115103045"),
    ];
    let resolution = resolve_location("test", &newest_first);
    assert_eq!(resolution.location.unwrap().latitude, Some(49.0));
    assert_eq!(resolution.used_operation.unwrap().oprn_type, "LASTLOC");
}

#[test]
fn equal_timestamps_keep_the_incumbent() {
    let ops = vec![
        plain_location_op("LOCATION", 48.0, 11.0, "20240115103045"),
        plain_location_op("LASTLOC", 49.0, 12.0, "20240115103045"),
    ];
    let resolution = resolve_location("test", &ops);
    let location = resolution.location.unwrap();
    assert_eq!(location.latitude, Some(48.0));
    assert_eq!(resolution.used_operation.unwrap().oprn_type, "LOCATION");
}

#[test]
fn only_encrypted_locations_find_nothing() {
    let ops = vec![
        enc_location_op("OFFLINE_LOC", 48.0, 11.0, "20240115103045", true),
        enc_location_op("OFFLINE_LOC", 49.0, 12.0, "20240115113045", true),
    ];
    let resolution = resolve_location("test", &ops);
    assert!(!resolution.location_found);
    assert!(resolution.location.is_none());
    assert!(resolution.used_operation.is_none());
}

#[test]
fn plain_enc_container_is_usable() {
    let ops = vec![enc_location_op("OFFLINE_LOC", 48.0, 11.0, "20240115103045", false)];
    let resolution = resolve_location("test", &ops);
    assert!(resolution.location_found);
    let location = resolution.location.unwrap();
    assert_eq!(location.latitude, Some(48.0));
    // 6/8 uncertainty combines to 10.0
    assert_eq!(location.accuracy, Some(10.0));
}

#[test]
fn non_location_operations_are_ignored() {
    let ops = vec![
        check_connection_op(json!("LEVEL_FULL")),
        op(json!({"oprnType": "RING", "latitude": "1.0", "extra": {"gpsUtcDt": "20240115103045"}})),
    ];
    let resolution = resolve_location("test", &ops);
    assert!(!resolution.location_found);
    assert!(resolution.used_operation.is_none());
}

#[test]
fn plain_location_without_date_is_skipped() {
    let undated = op(json!({
        "oprnType": "LOCATION",
        "latitude": "50.0",
        "longitude": "13.0"
    }));
    let ops = vec![undated, plain_location_op("LASTLOC", 48.0, 11.0, "20240115103045")];
    let resolution = resolve_location("test", &ops);
    let location = resolution.location.unwrap();
    assert_eq!(location.latitude, Some(48.0));
    assert_eq!(resolution.used_operation.unwrap().oprn_type, "LASTLOC");
}

#[test]
fn malformed_timestamp_skips_candidate_and_continues() {
    let ops = vec![
        plain_location_op("LOCATION", 50.0, 13.0, "2024-01-15 10:30"),
        plain_location_op("LASTLOC", 48.0, 11.0, "20240115103045"),
    ];
    let resolution = resolve_location("test", &ops);
    assert_eq!(resolution.location.unwrap().latitude, Some(48.0));
}

#[test]
fn enc_container_without_date_is_skipped() {
    let undated = op(json!({
        "oprnType": "OFFLINE_LOC",
        "encLocation": {"latitude": "50.0", "longitude": "13.0"}
    }));
    let resolution = resolve_location("test", &[undated]);
    assert!(resolution.location.is_none());
    assert!(!resolution.location_found);
}

#[test]
fn accuracy_follows_the_winning_operation() {
    let ops = vec![plain_location_op("LOCATION", 48.0, 11.0, "20240115103045")];
    let resolution = resolve_location("test", &ops);
    // fixture carries 3/4 uncertainty
    assert_eq!(resolution.location.unwrap().accuracy, Some(5.0));
}

#[test]
fn missing_uncertainty_means_no_accuracy() {
    let no_uncertainty = op(json!({
        "oprnType": "LOCATION",
        "latitude": "48.0",
        "longitude": "11.0",
        "extra": {"gpsUtcDt": "20240115103045"}
    }));
    let resolution = resolve_location("test", &[no_uncertainty]);
    assert!(resolution.location_found);
    assert_eq!(resolution.location.unwrap().accuracy, None);
}

#[test]
fn newer_dateonly_candidate_keeps_older_coordinates() {
    // An accepted candidate without coordinates advances the timestamp but
    // the last known coordinates stay.
    let coordless = op(json!({
        "oprnType": "OFFLINE_LOC",
        "encLocation": {"gpsUtcDt": "20240115113045"}
    }));
    let ops = vec![
        plain_location_op("LOCATION", 48.0, 11.0, "20240115103045"),
        coordless,
    ];
    let resolution = resolve_location("test", &ops);
    assert!(resolution.location_found);
    let location = resolution.location.unwrap();
    assert_eq!(location.latitude, Some(48.0));
    assert_eq!(
        location.timestamp,
        Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 45).unwrap()
    );
    assert_eq!(resolution.used_operation.unwrap().oprn_type, "OFFLINE_LOC");
}

#[test]
fn vendor_timestamp_round_trip() {
    let parsed = parse_find_timestamp("20240115103045").unwrap();
    assert_eq!(parsed.to_rfc3339(), "2024-01-15T10:30:45+00:00");
}

// Sub-location resolution

#[test]
fn first_matching_sub_unit_operation_wins() {
    let ops = vec![
        sub_unit_op(&[("left", 48.0, 11.0, "20240115103045")]),
        sub_unit_op(&[("left", 49.0, 12.0, "20240115113045")]),
    ];
    let (op, location) = resolve_sub_location(&ops, "left").unwrap();
    assert_eq!(op.oprn_type, "LASTLOC");
    // first match wins even though the second is newer
    assert_eq!(location.latitude, Some(48.0));
    assert_eq!(location.accuracy, Some(5.0));
}

#[test]
fn sub_unit_lookup_misses() {
    let ops = vec![sub_unit_op(&[("left", 48.0, 11.0, "20240115103045")])];
    assert!(resolve_sub_location(&ops, "right").is_none());
    assert!(resolve_sub_location(&ops, "").is_none());
    assert!(resolve_sub_location(&[], "left").is_none());
}

#[test]
fn sub_unit_ignores_plain_enc_containers() {
    let ops = vec![enc_location_op("OFFLINE_LOC", 48.0, 11.0, "20240115103045", false)];
    assert!(resolve_sub_location(&ops, "left").is_none());
}

// Battery extraction

#[test]
fn battery_maps_textual_levels() {
    let ops = vec![check_connection_op(json!("LEVEL_LOW"))];
    assert_eq!(battery_level("test", &ops), Some(15));
}

#[test]
fn battery_parses_numeric_levels() {
    assert_eq!(
        battery_level("test", &[check_connection_op(json!("85"))]),
        Some(85)
    );
    assert_eq!(
        battery_level("test", &[check_connection_op(json!(42))]),
        Some(42)
    );
}

#[test]
fn battery_invalid_or_missing_is_absent() {
    assert_eq!(
        battery_level("test", &[check_connection_op(json!("LEVEL_BOGUS"))]),
        None
    );
    assert_eq!(battery_level("test", &[op(json!({"oprnType": "CHECK_CONNECTION"}))]), None);
    assert_eq!(
        battery_level(
            "test",
            &[plain_location_op("LOCATION", 48.0, 11.0, "20240115103045")]
        ),
        None
    );
    assert_eq!(battery_level("test", &[]), None);
}
