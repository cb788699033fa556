// ── Core error types ──
//
// User-facing errors from switchdeck-core. Consumers never see HTTP
// status codes or WebSocket frames directly: the
// `From<switchdeck_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Home Assistant at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Home Assistant disconnected")]
    Disconnected,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Home Assistant error code (e.g. `"not_found"`, `"invalid_format"`).
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Card(#[from] ConfigurationError),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Card configuration errors ───────────────────────────────────────

/// Raised synchronously by the normalizer when a card configuration
/// cannot produce a usable port list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("card configuration must be a mapping")]
    NotAnObject,

    #[error("`{field}` must be a list of entity ids or port entries")]
    InvalidPorts { field: &'static str },

    #[error("port entry {index} has no entity id")]
    MissingEntity { index: usize },

    #[error("port entry {index} must be an entity id string or a mapping")]
    InvalidEntry { index: usize },

    #[error("`{field}` must be a string")]
    InvalidField { field: &'static str },

    #[error("no ports configured; set `ports`, or `device_id`/`device_name` to discover them")]
    NoPorts,
}

// ── Discovery failures ──────────────────────────────────────────────

/// Anything that stops discovery. Never surfaced to the host: the
/// resolver logs it and reports an empty result.
#[derive(Debug, Error)]
pub enum DiscoveryFailure {
    #[error("device registry query failed: {0}")]
    DeviceQuery(#[source] CoreError),

    #[error("entity registry query failed: {0}")]
    EntityQuery(#[source] CoreError),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<switchdeck_api::Error> for CoreError {
    fn from(err: switchdeck_api::Error) -> Self {
        match err {
            switchdeck_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            switchdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            switchdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            switchdeck_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            switchdeck_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            switchdeck_api::Error::Api { status: 404, message } => {
                CoreError::NotFound { identifier: message }
            }
            switchdeck_api::Error::Api { status, message } => CoreError::Api {
                message,
                code: None,
                status: Some(status),
            },
            switchdeck_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            switchdeck_api::Error::WebSocketClosed { code, reason } => {
                CoreError::ConnectionFailed {
                    url: String::new(),
                    reason: format!("WebSocket closed (code {code}): {reason}"),
                }
            }
            switchdeck_api::Error::NotConnected => CoreError::Disconnected,
            switchdeck_api::Error::Command { code, message } => CoreError::Api {
                message,
                code: Some(code),
                status: None,
            },
            switchdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
