//! SmartThings Find client abstraction

pub mod http_client;

use crate::error::Result;
use crate::model::{Device, Operation};
use async_trait::async_trait;
use rand::Rng;

/// Trait for SmartThings Find client implementations.
///
/// The polling coordinator is written against this trait so tests can drive
/// it with a mock instead of the live service.
#[async_trait]
pub trait FindClient: Send + Sync {
    /// Fetch a fresh CSRF token for the current session.
    ///
    /// Must succeed before any other call; failure means the session cookie
    /// is not (or no longer) valid.
    async fn fetch_csrf(&self) -> Result<()>;

    /// Retrieve the user's registered devices, excluding those the registry
    /// reports as disabled
    async fn get_devices(&self, registry: &dyn DeviceRegistry) -> Result<Vec<Device>>;

    /// Ask the device to report a fresh location (active mode).
    ///
    /// Fire-and-forget; the poll proceeds regardless of the outcome.
    async fn request_location_refresh(&self, device: &Device) -> Result<()>;

    /// Fetch the current stored operation list for a device
    async fn fetch_operations(&self, device: &Device) -> Result<Vec<Operation>>;
}

/// Host-side device registry lookup, used to filter devices the user has
/// disabled before they enter the polling session
pub trait DeviceRegistry: Send + Sync {
    fn is_device_disabled(&self, device_id: &str) -> bool;
}

/// Registry that never disables anything; the default for standalone use
pub struct NoDisabledDevices;

impl DeviceRegistry for NoDisabledDevices {
    fn is_device_disabled(&self, _device_id: &str) -> bool {
        false
    }
}

/// Generate the Samsung OAuth2 login URL for SmartThings Find.
///
/// The user opens this in a browser, signs in with their Samsung account
/// and copies the JSESSIONID cookie value from the browser dev tools.
pub fn login_url() -> String {
    const STATE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let state: String = (0..12)
        .map(|_| STATE_CHARS[rng.gen_range(0..STATE_CHARS.len())] as char)
        .collect();
    format!(
        "https://account.samsung.com/iam/oauth2/authorize\
         ?client_id=ntly6zvfpn\
         &redirect_uri=https%3A%2F%2Fsmartthingsfind.samsung.com%2Flogin.do\
         &response_type=code\
         &scope=iot.client\
         &state={state}::hound-prd\
         &locale=en-GB"
    )
}
