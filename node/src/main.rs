// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Arca Node
//!
//! Entry point for the `arca-node` binary. Parses CLI arguments, sets up
//! logging and metrics, opens the ledger database and serves the API.
//!
//! Subcommands:
//!
//! - `run`: serve the ledger
//! - `init`: create the data directory and a caller key
//! - `sign`: sign a vault call and print the JSON-RPC request
//! - `version`: print build version information

mod api;
mod cli;
mod host;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use arca_contracts::call::{SignedCall, VaultCall};
use arca_protocol::config::{CALLER_KEY_FILE, DB_DIR_NAME, EVENT_CHANNEL_CAPACITY, PROTOCOL_VERSION};
use arca_protocol::crypto::ArcaKeypair;
use arca_protocol::storage::ArcaDb;

use cli::{ArcaNodeCli, CallCommand, Commands};
use host::VaultHost;
use logging::{LogFormat, DEFAULT_FILTER};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ArcaNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Sign(args) => sign_call(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Serve the ledger until SIGINT or SIGTERM.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_FILTER, args.log_format);

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting arca-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join(DB_DIR_NAME);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = ArcaDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Ledger host ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let host = VaultHost::new(db.clone(), event_tx, Arc::clone(&node_metrics))
        .context("failed to load ledger state")?;

    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        host: Arc::new(host),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
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
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database")?;
    tracing::info!("arca-node stopped");
    Ok(())
}

/// Create the data directory and write a fresh caller key into it.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(DEFAULT_FILTER, LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = data_dir.join(CALLER_KEY_FILE);
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            key_path.display()
        );
    }

    let keypair = ArcaKeypair::generate();
    let account = keypair.account_id();

    std::fs::write(&key_path, keypair.secret_key_hex())
        .with_context(|| format!("failed to write caller key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(account = %account, key_path = %key_path.display(), "caller keypair generated");

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Caller key     : {}", key_path.display());
    println!("  Account        : {}", account.to_hex());

    Ok(())
}

/// Print a ready-to-post `vault_submit` request to stdout.
fn sign_call(args: cli::SignArgs) -> Result<()> {
    let keypair = load_keypair(&args.key_file)?;

    let call = match args.call {
        CallCommand::CreateVault(m) => VaultCall::CreateVault {
            metadata: m.metadata,
        },
        CallCommand::UpdateMetadata { vault_id, metadata } => VaultCall::UpdateMetadata {
            vault_id,
            metadata: metadata.metadata,
        },
        CallCommand::NominateMember(m) => VaultCall::NominateMember {
            vault_id: m.vault_id,
            member: m.member,
        },
        CallCommand::RemoveMember(m) => VaultCall::RemoveMember {
            vault_id: m.vault_id,
            member: m.member,
        },
        CallCommand::BurnVault { vault_id } => VaultCall::BurnVault { vault_id },
    };

    let signed = SignedCall::sign(&keypair, args.nonce, call).context("failed to sign call")?;
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "vault_submit",
        "params": signed,
        "id": args.id,
    });
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn load_keypair(path: &Path) -> Result<ArcaKeypair> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    ArcaKeypair::from_hex(contents.trim())
        .with_context(|| format!("invalid key in {}", path.display()))
}

fn print_version() {
    println!("arca-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
