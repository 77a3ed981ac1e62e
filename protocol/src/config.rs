//! # Protocol Configuration & Constants
//!
//! Every magic number in Arca lives here. If you're hardcoding a CID length
//! somewhere else, move it here first.
//!
//! Runtime knobs (ports, data directory, log format) are CLI arguments on the
//! node binary. What lives here is the part that every participant has to
//! agree on byte-for-byte.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Reported by `/status` and `arca-node version`. Bump the major part when
/// the call encoding or record layout changes.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Content Identifiers
// ---------------------------------------------------------------------------

/// Length of a CIDv0 string: base58btc of a 34-byte sha2-256 multihash.
pub const CID_V0_LENGTH: usize = 46;

/// Every CIDv0 starts with these two characters (multihash code 0x12,
/// digest length 0x20, rendered in base58btc).
pub const CID_V0_PREFIX: &str = "Qm";

// ---------------------------------------------------------------------------
// Accounts & Signatures
// ---------------------------------------------------------------------------

/// Account identifiers are Ed25519 public keys: 32 bytes.
pub const ACCOUNT_ID_LENGTH: usize = 32;

/// Signing key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// BLAKE3 `derive_key` context for signed vault calls. Changing it
/// invalidates every signature ever produced, so don't.
pub const CALL_SIGNING_CONTEXT: &str = "arca 2026-01 vault call v1";

// ---------------------------------------------------------------------------
// Vault Ids
// ---------------------------------------------------------------------------

/// The id assigned to the first vault ever created.
pub const FIRST_VAULT_ID: u64 = 0;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default port for the JSON-RPC / REST / WebSocket API.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Capacity of the broadcast channel that fans ledger events out to
/// WebSocket subscribers. Slow subscribers lag; they never block calls.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// File name of the caller keypair written by `arca-node init`.
pub const CALLER_KEY_FILE: &str = "caller.key";

/// Directory (inside the data dir) holding the sled database.
pub const DB_DIR_NAME: &str = "db";
