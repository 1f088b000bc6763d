//! Shared fixtures for integration tests
#![allow(dead_code)]

use serde_json::{json, Value};
use smartfind::{Device, Operation};

pub fn test_device(id: &str, device_type: &str) -> Device {
    Device {
        device_id: id.to_string(),
        display_name: format!("Device {id}"),
        model_id: "SM-TEST".to_string(),
        device_type: device_type.to_string(),
        owner_id: "user-1".to_string(),
        sub_unit_keys: Vec::new(),
        icon_url: None,
    }
}

pub fn buds_device(id: &str) -> Device {
    let mut device = test_device(id, "BUDS");
    device.sub_unit_keys = vec!["left".to_string(), "right".to_string()];
    device
}

/// Plain location operation with the UTC date in the extra attributes
pub fn plain_location_op(op_type: &str, lat: f64, lon: f64, date: &str) -> Operation {
    op(json!({
        "oprnType": op_type,
        "latitude": lat.to_string(),
        "longitude": lon.to_string(),
        "horizontalUncertainty": "3.0",
        "verticalUncertainty": "4.0",
        "extra": {"gpsUtcDt": date}
    }))
}

/// Location carried in an encLocation container
pub fn enc_location_op(op_type: &str, lat: f64, lon: f64, date: &str, encrypted: bool) -> Operation {
    op(json!({
        "oprnType": op_type,
        "encLocation": {
            "encrypted": encrypted,
            "gpsUtcDt": date,
            "latitude": lat.to_string(),
            "longitude": lon.to_string(),
            "horizontalUncertainty": "6.0",
            "verticalUncertainty": "8.0"
        }
    }))
}

/// Sub-unit operation mapping sub-unit keys to their own locations
pub fn sub_unit_op(subs: &[(&str, f64, f64, &str)]) -> Operation {
    let mut enc = serde_json::Map::new();
    for (key, lat, lon, date) in subs {
        enc.insert(
            key.to_string(),
            json!({
                "latitude": lat.to_string(),
                "longitude": lon.to_string(),
                "gpsUtcDt": date,
                "horizontalUncertainty": "3.0",
                "verticalUncertainty": "4.0"
            }),
        );
    }
    op(json!({"oprnType": "LASTLOC", "encLocation": enc}))
}

pub fn check_connection_op(battery: Value) -> Operation {
    op(json!({"oprnType": "CHECK_CONNECTION", "battery": battery}))
}

pub fn op(raw: Value) -> Operation {
    serde_json::from_value(raw).expect("fixture operation must deserialize")
}
