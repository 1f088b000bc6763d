//! SmartThings Find polling client - main entry point

use clap::{Parser, Subcommand};
use smartfind::client::{http_client::HttpFindClient, login_url, FindClient, NoDisabledDevices};
use smartfind::coordinator::PollCoordinator;
use smartfind::entity::{build_entities, Entity, EntityKind};
use smartfind::{CycleOutcome, FindError, Result, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Command line arguments
#[derive(Parser)]
#[command(name = "smartfind")]
#[command(about = "SmartThings Find polling client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll device locations on an interval
    Poll {
        /// JSESSIONID cookie value from the browser login flow
        #[arg(long, env = "SMARTFIND_JSESSIONID")]
        jsessionid: String,

        /// Seconds between polling cycles
        #[arg(long, default_value_t = 120)]
        interval: u64,

        /// Actively request fresh locations from SmartTags
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        active_smarttags: bool,

        /// Actively request fresh locations from phones and other devices
        /// (drains their batteries faster)
        #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
        active_others: bool,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Print the browser login URL used to obtain a session cookie
    LoginUrl,
}

#[tokio::main]
async fn main() -> Result<()> {
    smartfind::logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::LoginUrl => {
            println!("{}", login_url());
            Ok(())
        }
        Commands::Poll {
            jsessionid,
            interval,
            active_smarttags,
            active_others,
            once,
        } => {
            let mut config = SessionConfig::new(jsessionid);
            config.update_interval = Duration::from_secs(interval);
            config.active_mode_smarttags = active_smarttags;
            config.active_mode_others = active_others;
            config.validate()?;
            run_poll(config, once).await
        }
    }
}

async fn run_poll(config: SessionConfig, once: bool) -> Result<()> {
    match config.session_created_at {
        Some(created) => {
            let age = chrono::Utc::now() - created;
            info!(
                "Session age: {}d {}h (authenticated at {})",
                age.num_days(),
                age.num_hours() % 24,
                created.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => info!("Session age unknown (no timestamp provided)"),
    }

    let client = Arc::new(HttpFindClient::new(config.clone())?);

    // Raises an auth error if the session cookie is invalid; reaching the
    // device list means authentication is fine.
    client.fetch_csrf().await?;

    let devices = client.get_devices(&NoDisabledDevices).await?;
    info!("Loaded {} devices from the account", devices.len());

    let coordinator = Arc::new(PollCoordinator::new(client, config.clone(), devices));
    let entities = build_entities(&coordinator);

    let mut ticker = tokio::time::interval(config.update_interval);
    loop {
        ticker.tick().await;
        match coordinator.run_cycle().await {
            CycleOutcome::Success(_) => report(&entities).await,
            CycleOutcome::PartialFailure(reason) => {
                warn!("Update failed, retrying next cycle: {reason}");
            }
            CycleOutcome::AuthFailure(reason) => {
                error!("Session invalidated: {reason}");
                error!("Run 'smartfind login-url' and provide a fresh JSESSIONID");
                return Err(FindError::auth(reason));
            }
        }
        if once {
            return Ok(());
        }
    }
}

async fn report(entities: &[Entity]) {
    for entity in entities {
        if !entity.available().await {
            info!("{}: unavailable", entity.name());
            continue;
        }
        match entity.kind() {
            EntityKind::LocationTracker { .. } => {
                match (entity.latitude().await, entity.longitude().await) {
                    (Some(latitude), Some(longitude)) => {
                        let accuracy = entity
                            .location_accuracy()
                            .await
                            .map(|a| format!(" (±{a}m)"))
                            .unwrap_or_default();
                        info!("{}: {latitude:.6}, {longitude:.6}{accuracy}", entity.name());
                    }
                    _ => info!("{}: no location", entity.name()),
                }
            }
            EntityKind::BatterySensor => match entity.battery_level().await {
                Some(level) => info!("{}: {level}%", entity.name()),
                None => info!("{}: battery level unknown", entity.name()),
            },
        }
    }
}
