//! # CLI Interface
//!
//! Defines the command-line argument structure for `vault-node` using
//! `clap` derive. Supports three subcommands: `run`, `deploy`, and
//! `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use vault_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// Custody vault devnet node.
///
/// Provisions a devnet (native ledger, token service, vault) from a genesis
/// file and serves the vault over JSON-RPC, with Prometheus metrics on a
/// separate port.
#[derive(Parser, Debug)]
#[command(
    name = "vault-node",
    about = "Custody vault devnet node",
    version,
    propagate_version = true
)]
pub struct VaultNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the vault node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the devnet and serve the vault API.
    Run(RunArgs),
    /// Provision the devnet, deploy the vault, print the deployment summary
    /// as JSON and exit.
    Deploy(DeployArgs),
    /// Print version information and exit.
    Version,
}

/// Options shared by every subcommand that provisions a devnet.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the genesis file (JSON).
    ///
    /// When omitted, a single funded deployer owns the vault and no tokens exist.
    #[arg(long, short = 'g', env = "VAULT_GENESIS")]
    pub genesis: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "VAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "VAULT_LOG_LEVEL",
        default_value = "vault_node=info,vault_contracts=info,vault_protocol=info,tower_http=debug"
    )]
    pub log_level: String,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Interface to bind the API and metrics listeners to.
    #[arg(long, env = "VAULT_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "VAULT_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

/// Arguments for the `deploy` subcommand.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
