//! Presentation entities over the latest poll snapshot
//!
//! Capability variants instead of host-framework base classes: a location
//! tracker (optionally bound to one sub-unit) and a battery sensor. Both
//! read the coordinator's latest completed snapshot; they own no data of
//! their own.

use crate::coordinator::PollCoordinator;
use crate::model::Device;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What an entity presents
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// GPS tracker; bound to a sub-unit (e.g. one earbud) when set
    LocationTracker { sub_unit: Option<String> },
    /// Battery percentage sensor
    BatterySensor,
}

/// A presentable entity for one device capability
pub struct Entity {
    device: Device,
    kind: EntityKind,
    coordinator: Arc<PollCoordinator>,
}

impl Entity {
    pub fn new(device: Device, kind: EntityKind, coordinator: Arc<PollCoordinator>) -> Self {
        Self {
            device,
            kind,
            coordinator,
        }
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Stable unique id, following the original entity id scheme
    pub fn unique_id(&self) -> String {
        match &self.kind {
            EntityKind::LocationTracker { sub_unit: None } => {
                format!("stf_device_tracker_{}", self.device.device_id)
            }
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => format!("stf_device_tracker_{}_{sub}", self.device.device_id),
            EntityKind::BatterySensor => {
                format!("stf_device_battery_{}", self.device.device_id)
            }
        }
    }

    /// Human-readable entity name
    pub fn name(&self) -> String {
        match &self.kind {
            EntityKind::LocationTracker { sub_unit: None } => self.device.display_name.clone(),
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => format!("{} {}", self.device.display_name, capitalize(sub)),
            EntityKind::BatterySensor => format!("{} Battery", self.device.display_name),
        }
    }

    /// Entity picture, when the vendor provided a colored icon
    pub fn entity_picture(&self) -> Option<&str> {
        self.device.icon_url.as_deref()
    }

    /// An entity renders unavailable whenever the latest cycle failed, its
    /// device is missing from the snapshot, or the device's last update
    /// failed.
    pub async fn available(&self) -> bool {
        if !self.coordinator.last_cycle_success().await {
            return false;
        }
        match self.coordinator.device_snapshot(&self.device.device_id).await {
            Some(snapshot) => snapshot.update_success,
            None => false,
        }
    }

    pub async fn latitude(&self) -> Option<f64> {
        match &self.kind {
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => {
                self.coordinator
                    .sub_location(&self.device.device_id, sub)
                    .await?
                    .1
                    .latitude
            }
            EntityKind::LocationTracker { sub_unit: None } => {
                let snapshot = self
                    .coordinator
                    .device_snapshot(&self.device.device_id)
                    .await?;
                if !snapshot.location_found {
                    return None;
                }
                snapshot.location?.latitude
            }
            EntityKind::BatterySensor => None,
        }
    }

    pub async fn longitude(&self) -> Option<f64> {
        match &self.kind {
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => {
                self.coordinator
                    .sub_location(&self.device.device_id, sub)
                    .await?
                    .1
                    .longitude
            }
            EntityKind::LocationTracker { sub_unit: None } => {
                let snapshot = self
                    .coordinator
                    .device_snapshot(&self.device.device_id)
                    .await?;
                if !snapshot.location_found {
                    return None;
                }
                snapshot.location?.longitude
            }
            EntityKind::BatterySensor => None,
        }
    }

    pub async fn location_accuracy(&self) -> Option<f64> {
        match &self.kind {
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => {
                self.coordinator
                    .sub_location(&self.device.device_id, sub)
                    .await?
                    .1
                    .accuracy
            }
            EntityKind::LocationTracker { sub_unit: None } => {
                let snapshot = self
                    .coordinator
                    .device_snapshot(&self.device.device_id)
                    .await?;
                if !snapshot.location_found {
                    return None;
                }
                snapshot.location?.accuracy
            }
            EntityKind::BatterySensor => None,
        }
    }

    /// Timestamp of the location being presented
    pub async fn last_seen(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            EntityKind::LocationTracker {
                sub_unit: Some(sub),
            } => Some(
                self.coordinator
                    .sub_location(&self.device.device_id, sub)
                    .await?
                    .1
                    .timestamp,
            ),
            _ => {
                let snapshot = self
                    .coordinator
                    .device_snapshot(&self.device.device_id)
                    .await?;
                Some(snapshot.location?.timestamp)
            }
        }
    }

    /// Battery level; sub-unit trackers report none of their own
    pub async fn battery_level(&self) -> Option<i64> {
        if matches!(
            &self.kind,
            EntityKind::LocationTracker { sub_unit: Some(_) }
        ) {
            return None;
        }
        self.coordinator.battery_level(&self.device.device_id).await
    }
}

/// Build the full entity set for a coordinator: one tracker per device,
/// one tracker per sub-unit, one battery sensor per device.
pub fn build_entities(coordinator: &Arc<PollCoordinator>) -> Vec<Entity> {
    let mut entities = Vec::new();
    for device in coordinator.devices() {
        for sub in &device.sub_unit_keys {
            entities.push(Entity::new(
                device.clone(),
                EntityKind::LocationTracker {
                    sub_unit: Some(sub.clone()),
                },
                Arc::clone(coordinator),
            ));
        }
        entities.push(Entity::new(
            device.clone(),
            EntityKind::LocationTracker { sub_unit: None },
            Arc::clone(coordinator),
        ));
        entities.push(Entity::new(
            device.clone(),
            EntityKind::BatterySensor,
            Arc::clone(coordinator),
        ));
    }
    entities
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_sub_unit_names() {
        assert_eq!(capitalize("left"), "Left");
        assert_eq!(capitalize(""), "");
    }
}
