//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use switchdeck_config::ConfigError;
use switchdeck_core::{ConfigurationError, CoreError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Home Assistant at {url}")]
    #[diagnostic(
        code(switchdeck::connection_failed),
        help(
            "Check that Home Assistant is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(switchdeck::auth_failed),
        help(
            "Create a long-lived access token in your Home Assistant profile,\n\
             then run: switchdeck config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(switchdeck::no_credentials),
        help(
            "Configure one with: switchdeck config set-token\n\
             Or set the SWITCHDECK_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(switchdeck::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(switchdeck::api_error))]
    ApiError { message: String },

    #[error("{operation} failed for {entity_id}: {message}")]
    #[diagnostic(code(switchdeck::action_failed))]
    ActionFailed {
        operation: &'static str,
        entity_id: String,
        message: String,
    },

    #[error("Operation '{operation}' is not supported: requires {required}")]
    #[diagnostic(code(switchdeck::unsupported))]
    Unsupported { operation: String, required: String },

    // ── Card configuration ───────────────────────────────────────────
    #[error("Invalid card configuration: {0}")]
    #[diagnostic(
        code(switchdeck::card_config),
        help("Run: switchdeck check --card <FILE> to validate the configuration offline")
    )]
    CardConfig(#[from] ConfigurationError),

    #[error("No card configuration given")]
    #[diagnostic(
        code(switchdeck::no_card),
        help(
            "Pass --card <FILE>, or set one on the profile:\n\
             switchdeck config set card <FILE>"
        )
    )]
    NoCard,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(switchdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(switchdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: switchdeck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(switchdeck::no_config),
        help(
            "Create one with: switchdeck config init\n\
             Or pass --url and --token.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(switchdeck::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(switchdeck::timeout),
        help("Increase timeout with --timeout or check Home Assistant responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::CardConfig(_)
            | Self::NoCard
            | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ──────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: "(see: switchdeck config profiles)".into(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::Disconnected => Self::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "Home Assistant connection was lost".into(),
            },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound { identifier } => Self::NotFound {
                resource_type: "entity".into(),
                identifier,
                hint: "Run: switchdeck ports to see the configured ports".into(),
            },

            CoreError::Unsupported {
                operation,
                required,
            } => Self::Unsupported {
                operation,
                required,
            },

            CoreError::Api { message, .. } | CoreError::Internal(message) => {
                Self::ApiError { message }
            }

            CoreError::Config { message } => Self::Validation {
                field: "connection".into(),
                reason: message,
            },

            CoreError::Card(err) => Self::CardConfig(err),
        }
    }
}
