//! Clap derive structures for the `homee` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homee -- inspect and control a homee hub from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "homee",
    version,
    about = "Inspect and control a homee smart home hub",
    long_about = "Connects to a homee hub over its WebSocket push channel,\n\
        mirrors nodes, attributes and groups, and sends commands.",
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
    /// Hub profile to use
    #[arg(long, short = 'p', env = "HOMEE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub hostname or IP address (overrides profile)
    #[arg(long, short = 'H', env = "HOMEE_HOST", global = true)]
    pub host: Option<String>,

    /// Hub username (overrides profile)
    #[arg(long, short = 'u', env = "HOMEE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Hub password
    #[arg(long, env = "HOMEE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMEE_OUTPUT",
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

    /// Seconds to wait for the hub's initial snapshot
    #[arg(long, env = "HOMEE_TIMEOUT", default_value = "15", global = true)]
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
    /// List and inspect nodes
    #[command(alias = "n")]
    Nodes(NodesArgs),

    /// List and inspect groups
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// List hub users and their devices
    Users,

    /// Show hub settings and the current warning
    Info,

    /// Set an attribute's target value
    Set(SetArgs),

    /// Play a homeegram
    Play(PlayArgs),

    /// Stream hub events until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NODES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List all nodes
    #[command(alias = "ls")]
    List {
        /// Keep running and reprint the table whenever nodes change
        #[arg(long, short = 'f')]
        follow: bool,
    },

    /// Show one node with its groups
    Get {
        /// Node id or name
        node: String,
    },

    /// List a node's attributes
    #[command(alias = "attrs")]
    Attributes {
        /// Node id or name
        node: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GROUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List all groups
    #[command(alias = "ls")]
    List,

    /// Show one group with its member nodes
    Get {
        /// Group id or name
        group: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMMANDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Node id or name
    pub node: String,

    /// Attribute id
    pub attribute: i64,

    /// Target value
    pub value: f64,

    /// Return once the command is sent instead of waiting for the update
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Homeegram id
    pub homeegram: i64,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show events for this node id
    #[arg(long, short = 'n')]
    pub node: Option<i64>,

    /// Print every raw inbound message
    #[arg(long)]
    pub raw: bool,
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
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,

        /// Hub hostname or IP address
        #[arg(long)]
        hub: String,

        /// Hub username
        #[arg(long)]
        user: String,

        /// Environment variable holding the password
        #[arg(long)]
        password_env: Option<String>,

        /// Device label shown in the hub's device list
        #[arg(long)]
        device: Option<String>,
    },

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}
