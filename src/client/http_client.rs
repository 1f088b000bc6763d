//! HTTP client implementation for the SmartThings Find service
//!
//! Talks to the same endpoints the SmartThings Find web app uses. The
//! session is carried by a JSESSIONID cookie obtained through the browser
//! login flow; every request after that additionally needs the `_csrf`
//! token handed out by the login-check endpoint.

use crate::client::{DeviceRegistry, FindClient};
use crate::config::SessionConfig;
use crate::error::{FindError, Result};
use crate::model::{Device, Operation, OP_CHECK_CONNECTION_WITH_LOCATION, SUB_TYPE_DUAL};
use async_trait::async_trait;
use reqwest::{cookie::Jar, header, Client, ClientBuilder, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

const BASE_URL: &str = "https://smartthingsfind.samsung.com/";
const URL_GET_CSRF: &str = "https://smartthingsfind.samsung.com/chkLogin.do";
const URL_DEVICE_LIST: &str = "https://smartthingsfind.samsung.com/device/getDeviceList.do";
const URL_REQUEST_LOC_UPDATE: &str = "https://smartthingsfind.samsung.com/dm/addOperation.do";
const URL_FETCH_OPERATIONS: &str = "https://smartthingsfind.samsung.com/device/setLastSelect.do";

/// Browser User-Agent; the vendor rejects requests from obvious bots
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client for SmartThings Find
pub struct HttpFindClient {
    /// HTTP client with the isolated session cookie jar
    client: Client,

    /// Session configuration
    config: SessionConfig,

    /// CSRF token for the current session; written by `fetch_csrf` only,
    /// read-only during a polling cycle
    csrf: RwLock<Option<String>>,
}

impl HttpFindClient {
    /// Create a new client with a dedicated cookie jar seeded with the
    /// session cookie.
    ///
    /// A dedicated jar keeps the JSESSIONID scoped to the vendor host and
    /// isolated from anything else the process talks to.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let base = Url::parse(BASE_URL)
            .map_err(|e| FindError::config(format!("Invalid base URL: {e}")))?;

        let jar = Jar::default();
        jar.add_cookie_str(
            &format!("JSESSIONID={}; Path=/", config.jsessionid),
            &base,
        );

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::new(jar))
            .build()?;

        Ok(Self {
            client,
            config,
            csrf: RwLock::new(None),
        })
    }

    /// Current CSRF token, or an auth error if none was fetched yet
    async fn csrf_token(&self) -> Result<String> {
        self.csrf
            .read()
            .await
            .clone()
            .ok_or_else(|| FindError::auth("No CSRF token fetched for this session"))
    }
}

#[async_trait]
impl FindClient for HttpFindClient {
    async fn fetch_csrf(&self) -> Result<()> {
        let response = self.client.get(URL_GET_CSRF).send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            if let Some(token) = response
                .headers()
                .get("_csrf")
                .and_then(|v| v.to_str().ok())
            {
                *self.csrf.write().await = Some(token.to_string());
                info!("Successfully fetched new CSRF token");
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            let msg =
                format!("CSRF token not found in response headers. Status: {status}, response: '{body}'");
            error!("{msg}");
            return Err(FindError::auth(msg));
        }

        let body = response.text().await.unwrap_or_default();
        let msg = format!("Failed to authenticate with SmartThings Find: [{status}]: {body}");
        error!("{msg}");
        Err(FindError::auth(msg))
    }

    async fn get_devices(&self, registry: &dyn DeviceRegistry) -> Result<Vec<Device>> {
        let token = self.csrf_token().await?;
        let url = format!("{URL_DEVICE_LIST}?_csrf={token}");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&HashMap::<String, String>::new())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to retrieve devices [{status}]: {body}");
            if status == StatusCode::NOT_FOUND {
                warn!("Received 404 while trying to fetch devices, triggering reauth");
                return Err(FindError::auth("Request to get device list failed: 404"));
            }
            return Ok(Vec::new());
        }

        let body: Value = response.json().await?;
        let entries = body
            .get("deviceList")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut devices = Vec::new();
        for entry in &entries {
            let Some(device) = parse_device_entry(entry) else {
                warn!("Skipping malformed device entry: {entry}");
                continue;
            };
            if registry.is_device_disabled(&device.device_id) {
                debug!("Ignoring disabled device: '{}'", device.display_name);
                continue;
            }
            debug!("Adding device: {}", device.display_name);
            devices.push(device);
        }
        Ok(devices)
    }

    async fn request_location_refresh(&self, device: &Device) -> Result<()> {
        let token = self.csrf_token().await?;
        let payload = json!({
            "dvceId": device.device_id,
            "operation": OP_CHECK_CONNECTION_WITH_LOCATION,
            "usrId": device.owner_id,
        });

        let response = self
            .client
            .post(format!("{URL_REQUEST_LOC_UPDATE}?_csrf={token}"))
            .json(&payload)
            .send()
            .await?;
        debug!(
            "[{}] Location refresh request response: {}",
            device.display_name,
            response.status()
        );
        Ok(())
    }

    async fn fetch_operations(&self, device: &Device) -> Result<Vec<Operation>> {
        let token = self.csrf_token().await?;
        let payload = json!({
            "dvceId": device.device_id,
            "removeDevice": [],
        });

        let response = self
            .client
            .post(format!("{URL_FETCH_OPERATIONS}?_csrf={token}"))
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        debug!("[{}] Location response ({status})", device.display_name);

        if status == StatusCode::OK {
            let body: Value = response.json().await?;
            let operations = match body.get("operation") {
                Some(raw) => serde_json::from_value::<Vec<Operation>>(raw.clone())?,
                None => Vec::new(),
            };
            return Ok(operations);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("[{}] Full response: '{body}'", device.display_name);

        // Refreshing the CSRF token is not enough at this point; the user
        // has to go through the whole auth flow again.
        if body == "Logout" || status == StatusCode::UNAUTHORIZED {
            return Err(FindError::auth(format!(
                "Session not valid anymore, received status {status} with response '{body}'"
            )));
        }

        Err(FindError::transport(format!(
            "Failed to fetch device data ({status})"
        )))
    }
}

/// Decode a vendor display name.
///
/// The vendor double-escapes entities ("Ben&amp;#39;s S22" is really
/// "Ben's S22"), so the name is decoded twice on purpose.
fn decode_device_name(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw).into_owned();
    html_escape::decode_html_entities(&once).into_owned()
}

fn parse_device_entry(entry: &Value) -> Option<Device> {
    let device_id = entry.get("dvceID")?.as_str()?.to_string();
    let display_name = decode_device_name(
        entry.get("modelName").and_then(Value::as_str).unwrap_or(""),
    );
    let sub_unit_keys =
        if entry.get("subType").and_then(Value::as_str) == Some(SUB_TYPE_DUAL) {
            vec!["left".to_string(), "right".to_string()]
        } else {
            Vec::new()
        };

    Some(Device {
        device_id,
        display_name,
        model_id: entry
            .get("modelID")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        device_type: entry
            .get("deviceTypeCode")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        owner_id: entry
            .get("usrId")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        sub_unit_keys,
        icon_url: entry
            .get("icons")
            .and_then(|icons| icons.get("coloredIcon"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
