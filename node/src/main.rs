// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Devnet Node
//!
//! Entry point for the `vault-node` binary. Parses CLI arguments, initializes
//! logging and metrics, provisions the devnet from genesis, and serves the
//! vault over HTTP.
//!
//! The binary supports three subcommands:
//!
//! - `run`: provision the devnet and serve the API
//! - `deploy`: provision, print the deployment summary as JSON, exit
//! - `version`: print build version information

mod api;
mod cli;
mod devnet;
mod genesis;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;

use cli::{Commands, VaultNodeCli};
use devnet::Devnet;
use genesis::GenesisConfig;
use logging::LogFormat;
use metrics::VaultMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Deploy(args) => deploy(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Provisions the devnet and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        &args.common.log_level,
        LogFormat::from_str_lossy(&args.common.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        genesis = ?args.common.genesis,
        "starting vault-node"
    );

    let genesis = GenesisConfig::load_or_default(args.common.genesis.as_deref())?;
    let devnet = Devnet::from_genesis(&genesis)?;

    // --- Metrics ---
    let vault_metrics = Arc::new(VaultMetrics::new());
    vault_metrics.observe_vault(devnet.vault());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            vault_protocol::config::PROTOCOL_VERSION,
        ),
        devnet: Arc::new(Mutex::new(devnet)),
        metrics: Arc::clone(&vault_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&vault_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vault-node stopped");
    Ok(())
}

/// Provisions the devnet once and prints where everything landed.
fn deploy(args: cli::DeployArgs) -> Result<()> {
    logging::init_logging(
        &args.common.log_level,
        LogFormat::from_str_lossy(&args.common.log_format),
    );

    let genesis = GenesisConfig::load_or_default(args.common.genesis.as_deref())?;
    let devnet = Devnet::from_genesis(&genesis)?;
    let summary = serde_json::to_string_pretty(&devnet.summary())
        .context("failed to render deployment summary")?;
    println!("{}", summary);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vault-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", vault_protocol::config::PROTOCOL_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
