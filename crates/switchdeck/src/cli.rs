//! Clap derive structures for the `switchdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// switchdeck -- switch-port panels for Home Assistant
#[derive(Debug, Parser)]
#[command(
    name = "switchdeck",
    version,
    about = "Inspect and manage SNMP switch ports through Home Assistant",
    long_about = "Renders switch-port panels from a card configuration and the live\n\
        Home Assistant state, and toggles ports or edits their descriptions\n\
        through the SNMP Switch Manager integration.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "SWITCHDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Home Assistant URL (overrides profile)
    #[arg(long, short = 'u', env = "SWITCHDECK_URL", global = true)]
    pub url: Option<String>,

    /// Long-lived access token
    #[arg(long, env = "SWITCHDECK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SWITCHDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SWITCHDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "SWITCHDECK_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the ports of a card with their live state
    #[command(alias = "ls")]
    Ports(CardArgs),

    /// Print the rendered view tree of a card
    Render(RenderArgs),

    /// Turn a port on or off
    Toggle(ToggleArgs),

    /// Set a port description
    Describe(DescribeArgs),

    /// Discover the port entities of a switch device
    Discover(DiscoverArgs),

    /// Validate a card configuration without connecting
    Check(CheckArgs),

    /// List the card types this build provides
    Cards,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CARDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the card configuration comes from.
#[derive(Debug, Args)]
pub struct CardArgs {
    /// Card configuration file (YAML, or JSON by extension).
    /// Defaults to the profile's `card` entry.
    #[arg(long, short = 'c')]
    pub card: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub card: CardArgs,

    /// Render with the dialog open for this entity
    #[arg(long)]
    pub open: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub card: CardArgs,

    /// Check the built-in minimal configuration instead of a file
    #[arg(long, conflicts_with = "card")]
    pub stub: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Port entity id (e.g., switch.core_gi1_0_1)
    pub entity_id: String,

    /// Turn the port on
    #[arg(long, conflicts_with = "off", required_unless_present = "off")]
    pub on: bool,

    /// Turn the port off
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Port entity id
    pub entity_id: String,

    /// New description (empty clears it)
    pub text: String,
}

#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("identity").required(true))]
pub struct DiscoverArgs {
    /// Device registry id
    #[arg(long, group = "identity")]
    pub device_id: Option<String>,

    /// Device name (case-insensitive)
    #[arg(long, group = "identity")]
    pub device_name: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (tokens masked)
    Show,

    /// Print the config file location
    Path,

    /// Set a profile value
    Set {
        /// Key: url, token_env, card, insecure, timeout, refresh_interval, ca_cert
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an access token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
