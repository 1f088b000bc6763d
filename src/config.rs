//! Session and polling configuration

use crate::error::{FindError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

/// Minimum allowed poll interval; the vendor service throttles aggressively
/// below this.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Per-session configuration for the SmartThings Find client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSESSIONID cookie value obtained from the browser login flow
    pub jsessionid: String,

    /// Interval between polling cycles
    #[serde(with = "humantime_serde", default = "default_update_interval")]
    pub update_interval: Duration,

    /// Actively request fresh locations for SmartTag devices
    #[serde(default = "default_active_smarttags")]
    pub active_mode_smarttags: bool,

    /// Actively request fresh locations for all other devices (phones,
    /// earbuds, watches). Off by default since it drains their batteries.
    #[serde(default)]
    pub active_mode_others: bool,

    /// When the session cookie was obtained, if known. Only used for
    /// logging session age; the cookie itself is never persisted here.
    #[serde(default)]
    pub session_created_at: Option<DateTime<Utc>>,

    /// HTTP timeout for individual requests
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_update_interval() -> Duration {
    Duration::from_secs(120)
}

fn default_active_smarttags() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl SessionConfig {
    /// Create a configuration with defaults for the given session cookie
    pub fn new<S: Into<String>>(jsessionid: S) -> Self {
        Self {
            jsessionid: jsessionid.into(),
            update_interval: default_update_interval(),
            active_mode_smarttags: default_active_smarttags(),
            active_mode_others: false,
            session_created_at: None,
            timeout: default_timeout(),
        }
    }

    /// Load configuration from `SMARTFIND_*` environment variables
    pub fn from_env() -> Result<Self> {
        let jsessionid = env::var("SMARTFIND_JSESSIONID")
            .map_err(|_| FindError::config("SMARTFIND_JSESSIONID not set"))?;

        let mut config = Self::new(jsessionid);

        if let Ok(raw) = env::var("SMARTFIND_UPDATE_INTERVAL") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| FindError::config(format!("Invalid update interval: {raw}")))?;
            config.update_interval = Duration::from_secs(secs);
        }
        if let Ok(raw) = env::var("SMARTFIND_ACTIVE_MODE_SMARTTAGS") {
            config.active_mode_smarttags = raw == "1" || raw.eq_ignore_ascii_case("true");
        }
        if let Ok(raw) = env::var("SMARTFIND_ACTIVE_MODE_OTHERS") {
            config.active_mode_others = raw == "1" || raw.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.jsessionid.trim().is_empty() {
            return Err(FindError::config("JSESSIONID must not be empty"));
        }
        if self.update_interval < MIN_UPDATE_INTERVAL {
            return Err(FindError::config(format!(
                "Update interval must be at least {}s",
                MIN_UPDATE_INTERVAL.as_secs()
            )));
        }
        if self.timeout.is_zero() {
            return Err(FindError::config("Timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Whether active mode applies to the given device type code
    pub fn active_mode_for(&self, device_type: &str) -> bool {
        if device_type == "TAG" {
            self.active_mode_smarttags
        } else {
            self.active_mode_others
        }
    }
}
