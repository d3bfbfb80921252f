//! Clap derive structures for the `wanqos` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only clap and clap_complete may be used here: `build.rs` includes this
//! file to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wanqos -- traffic-class registry for WAN bandwidth shaping
#[derive(Debug, Parser)]
#[command(
    name = "wanqos",
    version,
    about = "Manage WAN traffic-shaping classes and the devices that enforce them",
    long_about = "Keeps a tree of rate-limiting classes with globally unique numeric\n\
        class ids, and tracks connect and heartbeat signals from shaping devices.",
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
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, env = "WANQOS_CONFIG_FILE", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides `[store] path`)
    #[arg(long, env = "WANQOS_DB", global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Output format (defaults to `[defaults] output`, then table)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Log Enums ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage traffic classes
    #[command(alias = "class", alias = "c")]
    Classes(ClassesArgs),

    /// Manage shaping devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Run a device agent loop: connect, then heartbeat and pull the tree
    Agent(AgentArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLASSES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClassesArgs {
    #[command(subcommand)]
    pub command: ClassesCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Ingress,
    Egress,
    Both,
}

#[derive(Debug, Subcommand)]
pub enum ClassesCommand {
    /// Create a class under the root or another class
    Create {
        /// Traffic direction the class shapes
        #[arg(long, short = 'd')]
        direction: Option<DirectionArg>,

        /// Guaranteed rate (e.g. 200kbit)
        #[arg(long, value_name = "RATE")]
        min: Option<String>,

        /// Ceiling rate (e.g. 512kbit)
        #[arg(long, value_name = "RATE")]
        max: Option<String>,

        /// Parent class ID (defaults to root)
        #[arg(long, short = 'p', value_name = "ID")]
        parent: Option<String>,
    },

    /// Change the rate bounds of a class
    Update {
        /// Class ID
        id: String,

        /// New guaranteed rate
        #[arg(long, value_name = "RATE")]
        min: Option<String>,

        /// New ceiling rate
        #[arg(long, value_name = "RATE")]
        max: Option<String>,
    },

    /// Get class details
    Get {
        /// Class ID
        id: String,
    },

    /// List every class except the root
    #[command(alias = "ls")]
    List,

    /// Delete a class (children are kept)
    #[command(alias = "rm")]
    Delete {
        /// Class ID
        id: String,
    },

    /// Show the class tree from the root
    Tree,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// Record a connect notification
    Connect {
        /// Device host name
        #[arg(long)]
        host: String,

        /// LAN-facing interface
        #[arg(long)]
        lan_port: String,

        /// WAN-facing interface
        #[arg(long)]
        wan_port: String,
    },

    /// Record a heartbeat from a connected device
    Heartbeat {
        /// Device host name
        #[arg(long)]
        host: String,
    },

    /// List known devices
    #[command(alias = "ls")]
    List,

    /// Get device details
    Get {
        /// Device ID (UUID)
        id: String,
    },

    /// Delete a device record
    #[command(alias = "rm")]
    Delete {
        /// Device ID (UUID)
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AGENT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AgentArgs {
    /// Host name this agent reports as
    #[arg(long)]
    pub host: String,

    /// LAN-facing interface
    #[arg(long)]
    pub lan_port: String,

    /// WAN-facing interface
    #[arg(long)]
    pub wan_port: String,

    /// Seconds between heartbeats
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub interval: u64,

    /// Stop after this many ticks (runs until Ctrl-C otherwise)
    #[arg(long, value_name = "N")]
    pub ticks: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
