// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `kubestrap`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubestrap",
    version,
    about = "Install a Kubernetes cluster with the bundled Ansible playbooks.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `KUBESTRAP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install the cluster described by the inventory and configuration.
    Install(InstallArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    /// Path to the inventory.ini file.
    #[arg(long, value_name = "PATH", default_value = "inventory.ini")]
    pub inventory: String,

    /// Path to the configuration.yaml used to override playbook defaults.
    #[arg(long, value_name = "PATH", default_value = "configuration.yaml")]
    pub configuration: String,

    /// Directory where assets generated during the installation are stored.
    #[arg(long, value_name = "DIR", default_value = "generated")]
    pub generated_assets_dir: String,

    /// Ansible verbosity level (0 disables the -v flag).
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Comma-separated hostnames to limit the execution to a subset of nodes.
    #[arg(long, value_name = "NODES", value_delimiter = ',')]
    pub limit: Vec<String>,

    /// Stage the run directory and log the resolved command without
    /// launching ansible.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
