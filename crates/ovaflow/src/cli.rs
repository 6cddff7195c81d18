//! Clap derive structures for the `ovaflow` CLI.
//!
//! Self-contained: `build.rs` includes this file to render man pages, so it
//! may only depend on clap and std.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ovaflow -- idempotent OVF appliance deployment for vSphere and VMC
#[derive(Debug, Parser)]
#[command(
    name = "ovaflow",
    version,
    about = "Deploy OVF appliances to vSphere and VMC, idempotently",
    long_about = "Ensures a content library and item exist, stages the OVA, deploys a VM,\n\
        attaches its network and reconciles the NSX objects that expose it.\n\n\
        Every step looks before it creates, so a run can be repeated safely.",
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
    #[arg(long, short = 'p', env = "OVAFLOW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// vCenter URL (overrides profile)
    #[arg(long, env = "OVAFLOW_VCENTER", global = true)]
    pub vcenter: Option<String>,

    /// vCenter username (overrides profile)
    #[arg(long, env = "OVAFLOW_USERNAME", global = true)]
    pub username: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OVAFLOW_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "OVAFLOW_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OVAFLOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full workflow described by a plan file
    Deploy(PlanArgs),

    /// Manage content libraries
    #[command(alias = "lib")]
    Library(LibraryArgs),

    /// Ensure a library item and upload its package
    Upload(UploadArgs),

    /// Reconcile NSX objects only
    #[command(alias = "net")]
    Network(NetworkArgs),

    /// Reconcile the network, then deploy through the external OVF tool
    Ovftool(PlanArgs),

    /// Manage configuration and stored secrets
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Plans ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Deployment plan (TOML)
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,
}

// ── Library ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LibraryArgs {
    #[command(subcommand)]
    pub command: LibraryCommand,
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    /// Create a local library unless one with this name exists
    Ensure {
        /// Library name
        name: String,

        /// Datastore backing the library
        #[arg(long)]
        datastore: String,

        /// Library description
        #[arg(long)]
        description: Option<String>,
    },

    /// List libraries with this name
    Find {
        /// Library name
        name: String,
    },
}

// ── Upload ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Library the item lives in
    #[arg(long)]
    pub library: String,

    /// Item name
    #[arg(long)]
    pub item: String,

    /// URL the server pulls the package from
    #[arg(long)]
    pub url: String,

    /// SHA-1 thumbprint of the source server's certificate
    #[arg(long)]
    pub ssl_thumbprint: Option<String>,

    /// File name inside the item (default: last URL path segment)
    #[arg(long)]
    pub file_name: Option<String>,

    /// Item type
    #[arg(long, default_value = "ovf")]
    pub item_type: String,
}

// ── Network ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetworkArgs {
    #[command(subcommand)]
    pub command: NetworkCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetworkCommand {
    /// Public IP, NAT rule, segment, groups and gateway policy rules
    Reconcile(PlanArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration with secrets masked
    Show,

    /// Store a profile secret in the system keyring
    SetSecret {
        /// Which secret to store
        #[arg(value_enum)]
        kind: SecretArg,

        /// Read the secret from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretArg {
    /// vCenter password
    Password,
    /// Cloud services refresh token
    RefreshToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
