//! Polling coordination: per-device fetches and the cycle state machine

use crate::client::FindClient;
use crate::config::SessionConfig;
use crate::error::{FindError, Result};
use crate::model::{
    CycleOutcome, Device, DeviceSnapshot, Operation, PollSnapshot, ResolvedLocation,
};
use crate::resolve::{battery_level, resolve_location, resolve_sub_location};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// Fetch one device's snapshot for the current cycle.
///
/// Errors are only returned for auth invalidation, which is fatal to the
/// whole cycle; every other failure is converted into a failed snapshot so
/// one device's fault never aborts the cycle.
pub async fn fetch_device_snapshot(
    client: &dyn FindClient,
    config: &SessionConfig,
    device: &Device,
) -> Result<DeviceSnapshot> {
    if config.active_mode_for(&device.device_type) {
        debug!(
            "[{}] Active mode; requesting location update now",
            device.display_name
        );
        // Fire-and-forget: only the subsequent fetch result matters.
        if let Err(err) = client.request_location_refresh(device).await {
            warn!(
                "[{}] Location refresh request failed: {err}",
                device.display_name
            );
        }
    } else {
        debug!(
            "[{}] Passive mode; not requesting location update",
            device.display_name
        );
    }

    match client.fetch_operations(device).await {
        Ok(operations) if operations.is_empty() => {
            // The service reported nothing at all; treated as a failed
            // update, not as silence.
            warn!(
                "[{}] No operation found in response; marking update failed",
                device.display_name
            );
            Ok(DeviceSnapshot::failed(device))
        }
        Ok(operations) => {
            let resolution = resolve_location(&device.display_name, &operations);
            Ok(DeviceSnapshot {
                device_id: device.device_id.clone(),
                display_name: device.display_name.clone(),
                update_success: true,
                location_found: resolution.location_found,
                location: resolution.location,
                used_operation: resolution.used_operation,
                operations,
            })
        }
        Err(err) if err.is_auth_error() => Err(err),
        Err(err) => {
            error!(
                "[{}] Error while fetching location data: {err}",
                device.display_name
            );
            Ok(DeviceSnapshot::failed(device))
        }
    }
}

/// Drives one fetch cycle across all known devices and holds the latest
/// completed snapshot.
///
/// One cycle at a time: the caller must not start cycle N+1 before cycle N
/// returned. Within a cycle all device fetches run concurrently; shared
/// state (CSRF token, active-mode flags) is read-only for the duration.
pub struct PollCoordinator {
    client: Arc<dyn FindClient>,
    config: SessionConfig,
    devices: Vec<Device>,
    /// Latest completed snapshot; only ever replaced wholesale
    snapshot: RwLock<Option<PollSnapshot>>,
    last_cycle_success: RwLock<bool>,
}

impl PollCoordinator {
    pub fn new(client: Arc<dyn FindClient>, config: SessionConfig, devices: Vec<Device>) -> Self {
        Self {
            client,
            config,
            devices,
            snapshot: RwLock::new(None),
            last_cycle_success: RwLock::new(false),
        }
    }

    /// Devices covered by this polling session
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Run one polling cycle: fan out over all devices, join, and publish
    /// the assembled snapshot atomically.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.fetch_all().await {
            Ok(snapshot) => {
                *self.snapshot.write().await = Some(snapshot.clone());
                *self.last_cycle_success.write().await = true;
                CycleOutcome::Success(snapshot)
            }
            Err(err) => {
                *self.last_cycle_success.write().await = false;
                if err.is_auth_error() {
                    error!("Polling cycle aborted, re-authentication required: {err}");
                    CycleOutcome::AuthFailure(err.to_string())
                } else {
                    warn!("Polling cycle failed: {err}");
                    CycleOutcome::PartialFailure(err.to_string())
                }
            }
        }
    }

    async fn fetch_all(&self) -> Result<PollSnapshot> {
        debug!("Updating locations for {} devices", self.devices.len());
        let results = join_all(
            self.devices
                .iter()
                .map(|device| fetch_device_snapshot(self.client.as_ref(), &self.config, device)),
        )
        .await;

        let mut snapshot = PollSnapshot::new();
        let mut auth_failure: Option<FindError> = None;
        for (device, result) in self.devices.iter().zip(results) {
            match result {
                Ok(device_snapshot) => {
                    snapshot.insert(device.device_id.clone(), device_snapshot);
                }
                Err(err) if err.is_auth_error() => {
                    // Takes priority over every completed result of this
                    // cycle; the partial snapshot is discarded, not
                    // published.
                    auth_failure = Some(err);
                }
                Err(err) => {
                    error!(
                        "Unexpected error fetching '{}': {err}",
                        device.display_name
                    );
                    snapshot.insert(device.device_id.clone(), DeviceSnapshot::failed(device));
                }
            }
        }
        if let Some(err) = auth_failure {
            return Err(err);
        }

        debug!("Fetched {} locations", snapshot.len());
        Ok(snapshot)
    }

    /// Whether the most recent cycle completed successfully
    pub async fn last_cycle_success(&self) -> bool {
        *self.last_cycle_success.read().await
    }

    /// Latest completed snapshot, if any cycle succeeded yet
    pub async fn snapshot(&self) -> Option<PollSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Latest snapshot entry for one device
    pub async fn device_snapshot(&self, device_id: &str) -> Option<DeviceSnapshot> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .and_then(|snapshot| snapshot.get(device_id))
            .cloned()
    }

    /// Sub-unit location for one device, recomputed from the latest
    /// snapshot on demand
    pub async fn sub_location(
        &self,
        device_id: &str,
        sub_unit_key: &str,
    ) -> Option<(Operation, ResolvedLocation)> {
        let snapshot = self.device_snapshot(device_id).await?;
        resolve_sub_location(&snapshot.operations, sub_unit_key)
    }

    /// Battery level for one device from the latest snapshot
    pub async fn battery_level(&self, device_id: &str) -> Option<i64> {
        let snapshot = self.device_snapshot(device_id).await?;
        battery_level(&snapshot.display_name, &snapshot.operations)
    }
}
