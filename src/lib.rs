//! # SmartThings Find client
//!
//! Async polling client for the SmartThings Find device-location service.
//! Authenticates with a browser session cookie, loads the account's device
//! list and periodically resolves the best-known location and battery level
//! for every device, including sub-units of multi-part hardware (earbuds).
//!
//! ## Architecture
//!
//! - **Client** ([`client`]): CSRF/session handling and the vendor wire
//!   protocol, behind the [`client::FindClient`] trait
//! - **Resolver** ([`resolve`]): selects the single best location and
//!   battery reading from a raw per-device operation list
//! - **Coordinator** ([`coordinator`]): fans one fetch cycle out over all
//!   devices and publishes an atomic per-cycle snapshot
//! - **Entities** ([`entity`]): presentation layer reading the latest
//!   snapshot

pub mod client;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod logging;
pub mod model;
pub mod resolve;
pub mod time;

pub use config::SessionConfig;
pub use error::{FindError, Result};
pub use model::{CycleOutcome, Device, DeviceSnapshot, Operation, PollSnapshot, ResolvedLocation};
