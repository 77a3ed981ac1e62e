//! # CLI Interface
//!
//! Command-line structure for `arca-node`, built with `clap` derive.
//! Subcommands: `run`, `init`, `sign` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use arca_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};
use arca_protocol::crypto::AccountId;
use arca_protocol::storage::VaultId;

use crate::logging::LogFormat;

/// Arca vault ledger host.
///
/// Keeps the vault access-control ledger in a local database, accepts
/// signed calls over JSON-RPC, streams vault events over WebSocket and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "arca-node",
    about = "Arca vault ledger host",
    version,
    propagate_version = true
)]
pub struct ArcaNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger host.
    Run(RunArgs),
    /// Create the data directory and generate a caller keypair.
    Init(InitArgs),
    /// Sign a vault call and print the `vault_submit` request body.
    Sign(SignArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger database.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "ARCA_DATA_DIR", default_value = ".arca")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC, REST and WebSocket API.
    #[arg(long, env = "ARCA_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ARCA_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    #[arg(long, env = "ARCA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "ARCA_DATA_DIR", default_value = ".arca")]
    pub data_dir: PathBuf,

    /// Overwrite an existing caller key.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct SignArgs {
    /// File holding the hex-encoded Ed25519 secret key, as written by `init`.
    #[arg(long, short = 'k')]
    pub key_file: PathBuf,

    /// Call nonce. Must exceed the last nonce the node accepted from this key.
    #[arg(long, short = 'n')]
    pub nonce: u64,

    /// JSON-RPC request id.
    #[arg(long, default_value_t = 1)]
    pub id: u64,

    #[command(subcommand)]
    pub call: CallCommand,
}

/// The call to sign.
#[derive(Subcommand, Debug, Clone)]
pub enum CallCommand {
    CreateVault(MetadataArg),
    UpdateMetadata {
        #[arg(long)]
        vault_id: VaultId,
        #[command(flatten)]
        metadata: MetadataArg,
    },
    NominateMember(MemberArgs),
    RemoveMember(MemberArgs),
    BurnVault {
        #[arg(long)]
        vault_id: VaultId,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArg {
    /// Content identifier, e.g. `Qm...`.
    #[arg(long)]
    pub metadata: String,
}

#[derive(Args, Debug, Clone)]
pub struct MemberArgs {
    #[arg(long)]
    pub vault_id: VaultId,
    /// Hex-encoded account id.
    #[arg(long)]
    pub member: AccountId,
}
