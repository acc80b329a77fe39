//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the devnet vault over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                          |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/health`                | Liveness check                       |
//! | GET    | `/status`                | Vault summary                        |
//! | GET    | `/vault/balance`         | Native counter                       |
//! | GET    | `/vault/balances`        | Every token counter, by asset        |
//! | GET    | `/vault/balances/:asset` | Token counter for one asset          |
//! | GET    | `/vault/events`          | Event journal, optionally paged      |
//! | GET    | `/accounts/:address`     | Native and genesis-token balances    |
//! | POST   | `/rpc`                   | JSON-RPC 2.0 gateway                 |
//!
//! ## JSON-RPC error codes
//!
//! | Code   | Meaning                                  |
//! |--------|------------------------------------------|
//! | -32600 | Invalid request envelope                 |
//! | -32601 | Unknown method                           |
//! | -32602 | Params missing or malformed              |
//! | -32001 | Caller is not the owner                  |
//! | -32002 | Invalid amount                           |
//! | -32003 | Insufficient token balance in custody    |
//! | -32004 | Token service refused the transfer       |
//! | -32005 | Native payment failed                    |
//! | -32006 | Counter overflow                         |
//! | -32007 | Value attached to a non-payable call     |
//! | -32008 | Invalid owner address                    |

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vault_contracts::{EventRecord, VaultError};
use vault_protocol::amount::{self, Amount};
use vault_protocol::{Address, AssetTransfer};

use crate::devnet::{CallError, DecodeError, Devnet, VaultCall};
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything sits behind `Arc`. The devnet lock is only
/// ever held synchronously, never across an `.await`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Chain and vault. One call at a time.
    pub devnet: Arc<Mutex<Devnet>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/vault/balance", get(balance_handler))
        .route("/vault/balances", get(all_balances_handler))
        .route("/vault/balances/:asset", get(asset_balance_handler))
        .route("/vault/events", get(events_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/rpc", post(rpc_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Named method parameters.
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<DecodeError> for JsonRpcError {
    fn from(err: DecodeError) -> Self {
        let code = match err {
            DecodeError::UnknownMethod(_) => -32601,
            DecodeError::InvalidParams(_) => -32602,
        };
        Self {
            code,
            message: err.to_string(),
            data: None,
        }
    }
}

impl From<&CallError> for JsonRpcError {
    fn from(err: &CallError) -> Self {
        let code = match err.kind() {
            "unauthorized" => -32001,
            "invalid_amount" => -32002,
            "insufficient_balance" => -32003,
            "native_payment_failure" => -32005,
            "overflow" => -32006,
            "non_payable" => -32007,
            "invalid_owner" => -32008,
            _ => -32004,
        };

        let mut data = json!({ "kind": err.kind() });
        match err {
            CallError::Vault(VaultError::InvalidAmount {
                reason,
                requested,
                available,
            }) => {
                data["reason"] = json!(reason);
                data["requested"] = json!(requested.to_string());
                data["available"] = json!(available.to_string());
            }
            CallError::Vault(VaultError::InsufficientBalance {
                asset,
                requested,
                available,
            }) => {
                data["asset"] = json!(asset);
                data["requested"] = json!(requested.to_string());
                data["available"] = json!(available.to_string());
            }
            _ => {}
        }

        Self {
            code,
            message: err.to_string(),
            data: Some(data),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Address of the vault.
    pub vault: Address,
    /// Current owner. Zero after renouncement.
    pub owner: Address,
    /// Token service the vault was configured with.
    pub token_service: Option<Address>,
    /// Native counter.
    #[serde(with = "amount::as_string")]
    pub native_balance: Amount,
    /// Number of assets with a counter.
    pub tracked_assets: usize,
    /// Number of tokens registered at the token service.
    pub tokens: usize,
    /// Length of the event journal.
    pub events: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /vault/balance` and `GET /vault/balances/:asset`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// The asset, absent for the native counter.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub asset: Option<Address>,
    #[serde(with = "amount::as_string")]
    pub balance: Amount,
}

/// Response payload for `GET /vault/balances`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackedBalances {
    #[serde(with = "amount::string_map")]
    pub balances: HashMap<Address, Amount>,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    /// Native balance on the host ledger.
    #[serde(with = "amount::as_string")]
    pub native_balance: Amount,
    /// Balances of the genesis tokens, by symbol.
    #[serde(with = "amount::string_map")]
    pub tokens: HashMap<String, Amount>,
}

/// Query string for `GET /vault/events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only events with `sequence >= since`.
    pub since: Option<u64>,
    /// At most this many events.
    pub limit: Option<usize>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    let vault = devnet.vault();
    Json(StatusResponse {
        version: state.version.clone(),
        vault: vault.address(),
        owner: vault.owner(),
        token_service: vault.token_service(),
        native_balance: vault.balance(),
        tracked_assets: vault.tracked_asset_count(),
        tokens: devnet.chain().tokens().token_count(),
        events: vault.events().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /vault/balance`
async fn balance_handler(State(state): State<AppState>) -> impl IntoResponse {
    let balance = state.devnet.lock().vault().balance();
    Json(BalanceResponse {
        asset: None,
        balance,
    })
}

/// `GET /vault/balances`: every asset the vault has held, zeroes included.
async fn all_balances_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    let balances: HashMap<Address, Amount> = devnet.vault().tracked_assets().collect();
    Json(TrackedBalances { balances })
}

/// `GET /vault/balances/:asset`: zero for assets the vault never held.
async fn asset_balance_handler(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let asset: Address = match asset.parse() {
        Ok(a) => a,
        Err(e) => return bad_request(format!("invalid asset id: {e}")),
    };
    let balance = state.devnet.lock().vault().balances(&asset);
    Json(BalanceResponse {
        asset: Some(asset),
        balance,
    })
    .into_response()
}

/// `GET /vault/events?since=N&limit=M`
async fn events_handler(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    let since = query.since.unwrap_or(0);
    let events: Vec<EventRecord> = devnet
        .events()
        .iter()
        .filter(|e| e.sequence >= since)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(events)
}

/// `GET /accounts/:address`
///
/// Unknown addresses report zero balances.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return bad_request(format!("invalid address: {e}")),
    };

    let devnet = state.devnet.lock();
    let chain = devnet.chain();
    let tokens = devnet
        .summary()
        .tokens
        .into_iter()
        .map(|t| {
            let balance = chain.tokens().balance_of(&t.asset, &address).unwrap_or(0);
            (t.symbol, balance)
        })
        .collect();

    Json(AccountResponse {
        address,
        native_balance: chain.native_balance(&address),
        tokens,
    })
    .into_response()
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
///
/// Decodes the call, runs it under the devnet lock, and maps vault errors to
/// the codes in the module table.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            req.id,
            JsonRpcError {
                code: -32600,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            },
        ));
    }

    let call = match VaultCall::decode(&req.method, req.params) {
        Ok(call) => call,
        Err(e) => {
            tracing::debug!(method = %req.method, error = %e, "rpc request not decoded");
            return Json(JsonRpcResponse::failure(req.id, e.into()));
        }
    };

    state
        .metrics
        .calls_total
        .with_label_values(&[req.method.as_str()])
        .inc();
    let _timer = state.metrics.call_latency_seconds.start_timer();

    let read_only = call.is_read_only();
    let outcome = {
        let mut devnet = state.devnet.lock();
        let outcome = devnet.execute(call);
        if !read_only {
            state.metrics.observe_vault(devnet.vault());
        }
        outcome
    };

    match outcome {
        Ok(result) => Json(JsonRpcResponse::success(req.id, result)),
        Err(e) => {
            state
                .metrics
                .rejected_total
                .with_label_values(&[req.method.as_str(), e.kind()])
                .inc();
            Json(JsonRpcResponse::failure(req.id, (&e).into()))
        }
    }
}

fn bad_request(error: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}
