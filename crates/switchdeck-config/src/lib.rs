//! Shared configuration for the switchdeck CLI and TUI.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), card
//! configuration files, and translation to
//! `switchdeck_core::ConnectionConfig`. Both binaries depend on this
//! crate; the CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use switchdeck_core::{ConnectionConfig, TlsVerification};

/// Service name under which tokens are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "switchdeck";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("card file {path} is not valid {format}: {reason}")]
    CardFile {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named Home Assistant profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, or the default one when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|profile| (name.clone(), profile))
            .ok_or(ConfigError::ProfileNotFound { name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named Home Assistant profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Home Assistant base URL (e.g., "http://homeassistant.local:8123").
    pub url: String,

    /// Long-lived access token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Full state refresh interval for long-running consumers, in seconds.
    pub refresh_interval: Option<u64>,

    /// Default card configuration file (YAML or JSON).
    pub card: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "switchdeck", "switchdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("switchdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from an explicit file path, layered with `SWITCHDECK_*`
/// environment overrides (`__` separates nested keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SWITCHDECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the access token from the credential chain: the profile's
/// `token_env` variable, then the system keyring, then plaintext.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |profile_name| keyring_entry(profile_name).ok()?.get_password().ok(),
    )
}

fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(val) = profile.token_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring(profile_name) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token for `profile_name` in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Connection config ───────────────────────────────────────────────

/// Parse and validate a profile URL.
pub fn profile_url(profile: &Profile) -> Result<url::Url, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// TLS strategy implied by a profile and the global default.
pub fn profile_tls(profile: &Profile, insecure_default: bool) -> TlsVerification {
    if profile.insecure.unwrap_or(insecure_default) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `ConnectionConfig` from a profile, no CLI flag overrides.
///
/// Suitable for the TUI and other long-running consumers: the
/// WebSocket feed is enabled and the profile's refresh interval applies.
pub fn profile_to_connection_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConnectionConfig, ConfigError> {
    let url = profile_url(profile)?;
    let token = resolve_token(profile, profile_name)?;

    let mut config = ConnectionConfig::new(url, token);
    config.tls = profile_tls(profile, defaults.insecure);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.websocket_enabled = true;
    config.refresh_interval_secs = profile.refresh_interval.unwrap_or(0);
    Ok(config)
}

// ── Card configuration files ────────────────────────────────────────

/// Read a raw card configuration. `.json` files are parsed as JSON,
/// anything else as YAML.
pub fn load_card_config(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&text).map_err(|e| ConfigError::CardFile {
            path: path.to_path_buf(),
            format: "JSON",
            reason: e.to_string(),
        })
    } else {
        serde_yaml::from_str(&text).map_err(|e| ConfigError::CardFile {
            path: path.to_path_buf(),
            format: "YAML",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn profile(url: &str) -> Profile {
        Profile {
            url: url.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[profiles.lab]
url = "http://ha.lab:8123"
token_env = "LAB_TOKEN"
card = "panel.yaml"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        let (name, lab) = config.profile(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(lab.url, "http://ha.lab:8123");
        assert_eq!(lab.card.as_deref(), Some(Path::new("panel.yaml")));
        assert_eq!(config.defaults.timeout, 30);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.profiles.is_empty());
        assert!(matches!(
            config.profile(Some("nope")),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config
            .profiles
            .insert("default".into(), profile("https://ha.example.com"));
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].url, "https://ha.example.com");
    }

    #[test]
    fn token_chain_prefers_env_then_keyring_then_plaintext() {
        let mut p = profile("http://ha:8123");
        p.token = Some("plain".into());
        p.token_env = Some("HA_TOKEN".into());

        let from_env = resolve_token_with(&p, "x", |_| Some("env".into()), |_| Some("ring".into()));
        assert_eq!(from_env.unwrap().expose_secret(), "env");

        let from_ring = resolve_token_with(&p, "x", |_| None, |_| Some("ring".into()));
        assert_eq!(from_ring.unwrap().expose_secret(), "ring");

        let plain = resolve_token_with(&p, "x", |_| None, |_| None);
        assert_eq!(plain.unwrap().expose_secret(), "plain");

        p.token = None;
        assert!(matches!(
            resolve_token_with(&p, "x", |_| None, |_| None),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(profile_url(&profile("ftp://ha")).is_err());
        assert!(profile_url(&profile("not a url")).is_err());
        assert!(profile_url(&profile("http://ha:8123")).is_ok());
    }

    #[test]
    fn tls_follows_profile_and_default() {
        let mut p = profile("https://ha");
        assert_eq!(profile_tls(&p, false), TlsVerification::SystemDefaults);
        assert_eq!(profile_tls(&p, true), TlsVerification::DangerAcceptInvalid);
        p.ca_cert = Some("ca.pem".into());
        assert_eq!(profile_tls(&p, false), TlsVerification::CustomCa("ca.pem".into()));
        p.insecure = Some(true);
        assert_eq!(profile_tls(&p, false), TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn card_files_parse_as_yaml_or_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("card.yaml");
        std::fs::write(&yaml, "title: Core\nports:\n  - switch.gi1\n  - entity: switch.gi2\n    x: 10\n    y: 20\n").unwrap();
        let json_path = dir.path().join("card.JSON");
        std::fs::write(&json_path, r#"{ "device_name": "SW1" }"#).unwrap();

        assert_eq!(
            load_card_config(&yaml).unwrap(),
            json!({ "title": "Core", "ports": ["switch.gi1", { "entity": "switch.gi2", "x": 10, "y": 20 }] })
        );
        assert_eq!(load_card_config(&json_path).unwrap(), json!({ "device_name": "SW1" }));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        assert!(matches!(
            load_card_config(&broken),
            Err(ConfigError::CardFile { format: "JSON", .. })
        ));
    }
}
