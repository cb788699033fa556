//! `switchdeck-tui`: terminal switch-port panel for Home Assistant.
//!
//! Hosts one SNMP switch port card: a grid of port tiles, or markers
//! positioned over a front-panel layout, with a detail dialog for
//! toggling a port and editing its description. State arrives live over
//! the Home Assistant WebSocket feed.
//!
//! Logs are written to a file (default `/tmp/switchdeck-tui.log`) to
//! avoid corrupting the terminal UI.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use secrecy::SecretString;
use serde_json::Value;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use switchdeck_core::{
    CardRegistry, ConnectionConfig, Controller, PortCard, TlsVerification, register_builtin_cards,
};

use crate::app::App;

/// Terminal panel for SNMP-managed switch ports on Home Assistant.
#[derive(Parser, Debug)]
#[command(name = "switchdeck-tui", version, about)]
struct Cli {
    /// Config profile to use (defaults to the configured default profile)
    #[arg(short = 'p', long, env = "SWITCHDECK_PROFILE")]
    profile: Option<String>,

    /// Home Assistant URL (e.g., http://homeassistant.local:8123)
    #[arg(short = 'u', long, env = "SWITCHDECK_URL")]
    url: Option<String>,

    /// Long-lived access token
    #[arg(short = 't', long, env = "SWITCHDECK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Card configuration file (YAML, or JSON by extension)
    #[arg(short = 'c', long)]
    card: Option<PathBuf>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/switchdeck-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Nothing may go to stdout/stderr while the TUI
/// owns the terminal. The guard must outlive the app so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "switchdeck_tui={log_level},switchdeck_core={log_level},switchdeck_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("switchdeck-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build a [`Controller`] from CLI flags, if a URL was given.
fn build_controller(cli: &Cli) -> Result<Option<Controller>> {
    let Some(url_str) = cli.url.as_deref() else {
        return Ok(None);
    };
    let url = url_str
        .parse()
        .wrap_err_with(|| format!("invalid Home Assistant URL: {url_str}"))?;
    let token = cli
        .token
        .clone()
        .ok_or_else(|| eyre!("--url requires --token or SWITCHDECK_TOKEN"))?;

    let mut config = ConnectionConfig::new(url, SecretString::from(token));
    if cli.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(Some(Controller::new(config)))
}

/// Controller from the shared config file, when a usable profile exists.
fn build_controller_from_config(cli: &Cli) -> Option<Controller> {
    let cfg = switchdeck_config::load_config().ok()?;
    let (name, profile) = cfg.profile(cli.profile.as_deref()).ok()?;
    match switchdeck_config::profile_to_connection_config(profile, &name, &cfg.defaults) {
        Ok(mut config) => {
            if cli.insecure {
                config.tls = TlsVerification::DangerAcceptInvalid;
            }
            Some(Controller::new(config))
        }
        Err(e) => {
            warn!(profile = %name, error = %e, "profile unusable");
            None
        }
    }
}

/// Card config: `--card`, then the profile's card file, then the stub.
fn load_card(cli: &Cli) -> Result<Value> {
    if let Some(path) = &cli.card {
        return Ok(switchdeck_config::load_card_config(path)?);
    }

    let profile_card = switchdeck_config::load_config()
        .ok()
        .and_then(|cfg| {
            cfg.profile(cli.profile.as_deref())
                .ok()
                .and_then(|(_, profile)| profile.card.clone())
        });
    match profile_card {
        Some(path) => Ok(switchdeck_config::load_card_config(&path)?),
        None => Ok(PortCard::stub_config()),
    }
}

/// Warn when the config names a card type this host does not offer.
fn check_card_type(registry: &CardRegistry, card_config: &Value) {
    let Some(card_type) = card_config.get("type").and_then(Value::as_str) else {
        return;
    };
    let bare = card_type.strip_prefix("custom:").unwrap_or(card_type);
    match registry.get(bare) {
        Some(card) => info!(card_type = card.card_type, name = card.name, "hosting card"),
        None => warn!(card_type, "unknown card type, rendering as a port card"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    info!(
        url = cli.url.as_deref().unwrap_or("(profile)"),
        profile = cli.profile.as_deref().unwrap_or("(default)"),
        "starting switchdeck-tui"
    );

    let mut registry = CardRegistry::new();
    register_builtin_cards(&mut registry);

    let card_config = load_card(&cli)?;
    check_card_type(&registry, &card_config);
    let controller = match build_controller(&cli)? {
        Some(controller) => Some(controller),
        None => build_controller_from_config(&cli),
    };
    if controller.is_none() {
        warn!("no connection configured, running offline");
    }

    let mut app = App::new(controller, &card_config);
    app.run().await?;

    // Let the data bridge finish its disconnect.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
