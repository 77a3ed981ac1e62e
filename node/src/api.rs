//! # REST + WebSocket API
//!
//! The axum router for the node's HTTP interface. Handlers share an
//! [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                           | Description                     |
//! |--------|--------------------------------|---------------------------------|
//! | GET    | `/health`                      | Liveness probe                  |
//! | GET    | `/status`                      | Version and vault counters      |
//! | POST   | `/rpc`                         | JSON-RPC 2.0 gateway            |
//! | GET    | `/ws`                          | Live stream of vault events     |
//! | GET    | `/vaults/:id`                  | Vault snapshot                  |
//! | GET    | `/vaults/:id/owner/:account`   | Is `account` the owner?         |
//! | GET    | `/vaults/:id/member/:account`  | Is `account` a member?          |
//!
//! ## JSON-RPC methods
//!
//! | Method                  | Params                      | Result                 |
//! |-------------------------|-----------------------------|------------------------|
//! | `vault_submit`          | signed call object          | receipt                |
//! | `vault_probe`           | `{caller, call}`            | `{ok, error?, message?}` |
//! | `vault_ownerOf`         | `[id]`                      | account or `null`      |
//! | `vault_getMetadata`     | `[id]`                      | CID or `null`          |
//! | `vault_authorizeOwner`  | `[id, account]`             | bool                   |
//! | `vault_authorizeMember` | `[id, account]`             | bool                   |
//! | `vault_nonce`           | `[account]`                 | u64 or `null`          |
//! | `vault_count`           | none                        | `{vault_count, next_vault_id}` |
//!
//! Ledger rejections (`AccessDenied`, `MetadataNotValid`) are *results*.
//! JSON-RPC errors are reserved for envelope problems: malformed params,
//! bad signatures, stale nonces, storage failures.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use arca_contracts::call::{SignedCall, VaultCall};
use arca_contracts::vault_ledger::{VaultError, VaultEvent};
use arca_protocol::cid::ContentId;
use arca_protocol::crypto::AccountId;
use arca_protocol::storage::{StoreError, VaultId, VaultRecord};

use crate::host::{SubmitError, VaultHost};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Reported version string.
    pub version: String,
    pub host: Arc<VaultHost>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Build the full router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/vaults/:id", get(vault_handler))
        .route("/vaults/:id/owner/:account", get(owner_check_handler))
        .route("/vaults/:id/member/:account", get(member_check_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// Invalid JSON-RPC envelope.
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Signature did not verify against the caller.
pub const BAD_SIGNATURE: i32 = -32002;
/// Nonce not greater than the caller's last accepted one.
pub const STALE_NONCE: i32 = -32003;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    /// Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, format!("Internal error: {err}"))
    }
}

impl From<SubmitError> for JsonRpcError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Call(e) => Self::new(BAD_SIGNATURE, e.to_string()),
            SubmitError::StaleNonce { got, last } => Self {
                code: STALE_NONCE,
                message: format!("Stale nonce: got {got}, last accepted {last}"),
                data: Some(serde_json::json!({ "last_nonce": last })),
            },
            SubmitError::Storage(e) => Self::internal(e),
        }
    }
}

impl From<StoreError> for JsonRpcError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

/// Params of `vault_probe`.
#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    pub caller: AccountId,
    pub call: VaultCall,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub protocol_version: String,
    pub vault_count: u64,
    pub next_vault_id: VaultId,
    /// RFC 3339.
    pub timestamp: String,
}

/// `GET /vaults/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultResponse {
    pub vault_id: VaultId,
    pub owner: AccountId,
    pub members: Vec<AccountId>,
    pub metadata: ContentId,
}

impl VaultResponse {
    fn new(vault_id: VaultId, record: VaultRecord) -> Self {
        Self {
            vault_id,
            owner: record.owner,
            members: record.members.into_iter().collect(),
            metadata: record.metadata,
        }
    }
}

/// `GET /vaults/:id/{owner,member}/:account`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub vault_id: VaultId,
    pub account: AccountId,
    pub authorized: bool,
}

/// Result of `vault_probe`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body for REST endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Liveness only; no subsystem checks.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`.
async fn status_handler(State(state): State<AppState>) -> Response {
    let counters = state
        .host
        .query(|ledger| Ok((ledger.vault_count()?, ledger.next_vault_id()?)));

    match counters {
        Ok((count, next)) => Json(StatusResponse {
            version: state.version.clone(),
            protocol_version: arca_protocol::config::PROTOCOL_VERSION.to_string(),
            vault_count: count as u64,
            next_vault_id: next,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {e}"),
        ),
    }
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    let outcome = if req.jsonrpc != "2.0" {
        Err(JsonRpcError::new(
            INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ))
    } else {
        // Submits take the ledger lock and write to sled; keep them off the
        // async workers.
        let method = req.method;
        let params = req.params;
        tokio::task::spawn_blocking(move || dispatch(&state, &method, params))
            .await
            .unwrap_or_else(|e| Err(JsonRpcError::internal(e)))
    };

    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };
    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(JsonRpcError::internal)
}

fn dispatch(
    state: &AppState,
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let host = &state.host;
    match method {
        "vault_submit" => {
            let signed: SignedCall = parse_params(params)?;
            let receipt = host.submit(&signed)?;
            to_value(receipt)
        }
        "vault_probe" => {
            let ProbeParams { caller, call } = parse_params(params)?;
            let response = match host.probe(&caller, &call) {
                Ok(()) => ProbeResponse {
                    ok: true,
                    error: None,
                    message: None,
                },
                Err(VaultError::Storage(e)) => return Err(e.into()),
                Err(e) => ProbeResponse {
                    ok: false,
                    error: Some(e.kind().to_string()),
                    message: Some(e.to_string()),
                },
            };
            to_value(response)
        }
        "vault_ownerOf" => {
            let (vault_id,): (VaultId,) = parse_params(params)?;
            to_value(host.query(|ledger| ledger.owner_of(vault_id))?)
        }
        "vault_getMetadata" => {
            let (vault_id,): (VaultId,) = parse_params(params)?;
            to_value(host.query(|ledger| ledger.get_metadata(vault_id))?)
        }
        "vault_authorizeOwner" => {
            let (vault_id, account): (VaultId, AccountId) = parse_params(params)?;
            to_value(host.query(|ledger| ledger.authorize_owner(vault_id, &account))?)
        }
        "vault_authorizeMember" => {
            let (vault_id, account): (VaultId, AccountId) = parse_params(params)?;
            to_value(host.query(|ledger| ledger.authorize_member(vault_id, &account))?)
        }
        "vault_nonce" => {
            let (account,): (AccountId,) = parse_params(params)?;
            to_value(host.nonce(&account)?)
        }
        "vault_count" => {
            let (count, next) =
                host.query(|ledger| Ok((ledger.vault_count()?, ledger.next_vault_id()?)))?;
            Ok(serde_json::json!({ "vault_count": count, "next_vault_id": next }))
        }
        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )),
    }
}

/// `GET /ws`: push-only stream of [`VaultEvent`]s as JSON text frames.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.host.subscribe();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, rx))
}

/// Forward events until the client leaves or the channel closes.
async fn handle_ws_connection(mut socket: WebSocket, mut rx: broadcast::Receiver<VaultEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to serialize ws event");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

/// `GET /vaults/:id`: 404 if the vault was never created or was burnt.
async fn vault_handler(Path(vault_id): Path<VaultId>, State(state): State<AppState>) -> Response {
    match state.host.query(|ledger| ledger.vault(vault_id)) {
        Ok(Some(record)) => Json(VaultResponse::new(vault_id, record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Vault {vault_id} not found"),
        ),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {e}"),
        ),
    }
}

#[derive(Clone, Copy)]
enum Role {
    Owner,
    Member,
}

async fn owner_check_handler(
    Path((vault_id, account)): Path<(VaultId, String)>,
    State(state): State<AppState>,
) -> Response {
    authorization_check(&state, vault_id, &account, Role::Owner)
}

async fn member_check_handler(
    Path((vault_id, account)): Path<(VaultId, String)>,
    State(state): State<AppState>,
) -> Response {
    authorization_check(&state, vault_id, &account, Role::Member)
}

/// Unknown vaults answer `authorized: false`, never 404.
fn authorization_check(state: &AppState, vault_id: VaultId, account: &str, role: Role) -> Response {
    let account: AccountId = match account.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Bad account: {e}")),
    };

    let authorized = state.host.query(|ledger| match role {
        Role::Owner => ledger.authorize_owner(vault_id, &account),
        Role::Member => ledger.authorize_member(vault_id, &account),
    });

    match authorized {
        Ok(authorized) => Json(AuthorizationResponse {
            vault_id,
            account,
            authorized,
        })
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {e}"),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
