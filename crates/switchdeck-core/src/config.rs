// ── Runtime connection configuration ──
//
// These types describe *how* to reach a Home Assistant instance. They
// carry the access token and connection tuning but never touch disk.
// The CLI/TUI builds a `ConnectionConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single Home Assistant instance.
///
/// Built by CLI/TUI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Home Assistant base URL (e.g., `http://homeassistant.local:8123`).
    pub url: Url,
    /// Long-lived access token.
    pub token: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Enable the WebSocket connection (registries + live state).
    pub websocket_enabled: bool,
    /// Polling interval for full state refreshes (seconds). 0 = never.
    pub refresh_interval_secs: u64,
}

impl ConnectionConfig {
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            websocket_enabled: true,
            refresh_interval_secs: 0,
        }
    }
}
