//! CLI configuration: thin wrapper around `switchdeck_config` shared types.
//!
//! Adds the resolution that respects `GlobalOpts` flag overrides
//! (--url, --token, --insecure, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;

use switchdeck_core::{ConnectionConfig, TlsVerification};

use crate::cli::{CardArgs, GlobalOpts};
use crate::error::CliError;

pub use switchdeck_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ConnectionConfig` from the config file, profile, and flags.
///
/// One-shot commands never need periodic refresh; the WebSocket is
/// left off and turned on by the commands that query registries.
pub fn build_connection_config(global: &GlobalOpts) -> Result<ConnectionConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, global, &cfg.defaults)?,
        None => from_flags(global, &profile_name)?,
    };
    config.websocket_enabled = false;
    config.refresh_interval_secs = 0;
    Ok(config)
}

/// Translate a `Profile` + global flags into a `ConnectionConfig`.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    defaults: &Defaults,
) -> Result<ConnectionConfig, CliError> {
    // 1. URL (flag > env > profile)
    let url = match global.url.as_deref() {
        Some(url_str) => parse_url(url_str)?,
        None => switchdeck_config::profile_url(profile)?,
    };

    // 2. Token (flag > profile resolution)
    let token = match &global.token {
        Some(token) => SecretString::from(token.clone()),
        None => switchdeck_config::resolve_token(profile, profile_name)?,
    };

    let mut config = ConnectionConfig::new(url, token);

    // 3. TLS verification
    config.tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        switchdeck_config::profile_tls(profile, defaults.insecure)
    };

    // 4. Timeout
    config.timeout = Duration::from_secs(global.timeout);
    Ok(config)
}

/// No profile: build from CLI flags / env vars alone.
fn from_flags(global: &GlobalOpts, profile_name: &str) -> Result<ConnectionConfig, CliError> {
    let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = parse_url(url_str)?;

    let token = global
        .token
        .clone()
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.to_owned(),
        })?;

    let mut config = ConnectionConfig::new(url, SecretString::from(token));
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    config.timeout = Duration::from_secs(global.timeout);
    Ok(config)
}

fn parse_url(url_str: &str) -> Result<url::Url, CliError> {
    url_str.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {url_str}"),
    })
}

/// Resolve the card file: `--card`, then the active profile's `card`.
pub fn card_path(args: &CardArgs, global: &GlobalOpts) -> Result<PathBuf, CliError> {
    if let Some(path) = &args.card {
        return Ok(path.clone());
    }
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);
    cfg.profiles
        .get(&profile_name)
        .and_then(|profile| profile.card.clone())
        .ok_or(CliError::NoCard)
}

/// Load the raw card configuration for a command.
pub fn load_card(args: &CardArgs, global: &GlobalOpts) -> Result<Value, CliError> {
    let path = card_path(args, global)?;
    Ok(switchdeck_config::load_card_config(&path)?)
}
