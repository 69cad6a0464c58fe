//! Clap derive structures for the `wisply` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wisply -- PPPoE access enforcement and MikroTik router synchronization
#[derive(Debug, Parser)]
#[command(
    name = "wisply",
    version,
    about = "Keep billing-driven customer access in sync with RouterOS devices",
    long_about = "Back-office tooling for ISP network enforcement.\n\n\
        Talks to MikroTik routers over the binary API to scan, audit, and\n\
        mutate customer PPPoE state, verifying every change against the\n\
        live device before trusting it.",
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
    /// Config file path
    #[arg(long, short = 'C', env = "WISPLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long, env = "WISPLY_DATABASE", global = true)]
    pub database: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Device timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan routers and map customers to the router carrying their secret
    Scan(ScanArgs),

    /// Health-check routers (CPU, uptime, firmware, online count)
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Manage the local mirror of router PPP profiles
    #[command(alias = "prof")]
    Profiles(ProfilesArgs),

    /// Enforce or inspect a customer's network access state
    #[command(alias = "cust")]
    Customers(CustomersArgs),

    /// Audit database state against live routers
    Audit,

    /// Manage registered routers
    Routers(RoutersArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SCAN / MONITOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Scan a single router by name (default: all, including inactive)
    #[arg(long, short = 'r')]
    pub router: Option<String>,

    /// Report matches without saving anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Check a single router by name (default: all, including inactive)
    #[arg(long, short = 'r')]
    pub router: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROFILES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// Mirror router profiles into the local cache
    Sync {
        /// Sync a single router by name (default: all)
        #[arg(long, short = 'r')]
        router: Option<String>,
    },

    /// Diff live router profiles against the local cache (read-only)
    Analyze,

    /// List cached profiles
    #[command(alias = "ls")]
    List {
        /// Limit to one router by name
        #[arg(long, short = 'r')]
        router: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CUSTOMERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CustomersArgs {
    #[command(subcommand)]
    pub command: CustomersCommand,
}

#[derive(Debug, Subcommand)]
pub enum CustomersCommand {
    /// Show a customer's stored state
    Show {
        /// PPPoE username
        pppoe_user: String,
    },

    /// Flip a provisioned customer to active (requires the secret to exist)
    Activate {
        /// PPPoE username
        pppoe_user: String,
    },

    /// Isolate a customer (verified switch to the isolation profile)
    Isolate {
        /// PPPoE username
        pppoe_user: String,
    },

    /// Restore an isolated customer's previous profile (verified)
    Reconnect {
        /// PPPoE username
        pppoe_user: String,
    },

    /// Terminate a customer (best-effort session kick, never blocks)
    Terminate {
        /// PPPoE username
        pppoe_user: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROUTERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RoutersArgs {
    #[command(subcommand)]
    pub command: RoutersCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoutersCommand {
    /// List registered routers with their latest snapshots
    #[command(alias = "ls")]
    List,

    /// Upsert the routers declared in the config file
    Seed,
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
    /// Write a starter config file with default values
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
