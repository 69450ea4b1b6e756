//! API Routes
//!
//! HTTP endpoint definitions. Amounts cross this boundary as decimal
//! strings and are run through the money codec before the ledger is
//! called; balances and history amounts are formatted on the way out.

use axum::{
    extract::{Extension, Query, State},
    http::{header, HeaderMap, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::auth::{SessionUser, UserRecord, SESSION_COOKIE};
use crate::domain::{money, TransactionKind};
use crate::error::AppError;
use crate::state::AppState;

use super::middleware::{logging_middleware, session_auth, session_token, CurrentUser};

/// Default number of history items when `limit` is missing or unparsable.
const DEFAULT_HISTORY_LIMIT: i64 = 10;
/// Largest history page a caller may request.
const MAX_HISTORY_LIMIT: i64 = 100;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub balance: String,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_username: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// Kept as a raw string so junk like `limit=abc` falls back to the
    /// default instead of rejecting the request.
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionItem {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: String,
    pub counterparty: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub items: Vec<TransactionItem>,
}

// =========================================================================
// API Router
// =========================================================================

/// Build the application router around shared state.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/transfer", post(transfer))
        .route("/transactions", get(list_transactions))
        .layer(middleware::from_fn_with_state(state.clone(), session_auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =========================================================================
// GET /api/health
// =========================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =========================================================================
// POST /api/register
// =========================================================================

/// Create a user and their zero-balance account, then log them in.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "username and password required".to_string(),
        ));
    }

    let user = state.registry.register(username, &request.password)?;
    state.ledger.create_account(user.id)?;
    tracing::info!(user_id = user.id, username = %user.username, "account registered");

    start_session(&state, user)
}

// =========================================================================
// POST /api/login
// =========================================================================

async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let username = request.username.trim();
    let user = state
        .registry
        .authenticate(username, &request.password)
        .ok_or(AppError::InvalidCredentials)?;

    start_session(&state, user)
}

// =========================================================================
// POST /api/logout
// =========================================================================

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(token);
    }

    let mut response = Json(OkResponse { ok: true }).into_response();
    set_cookie(
        &mut response,
        &format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    )?;
    Ok(response)
}

// =========================================================================
// GET /api/me
// =========================================================================

/// Current user's name and formatted balance.
async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<MeResponse>, AppError> {
    let balance = state.ledger.balance(user.id)?;
    Ok(Json(MeResponse {
        username: user.username,
        balance: money::format_minor(balance),
    }))
}

// =========================================================================
// POST /api/deposit
// =========================================================================

async fn deposit(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let amount_minor = money::parse_minor(&request.amount)?;
    state.ledger.deposit(user.id, amount_minor)?;
    Ok(Json(OkResponse { ok: true }))
}

// =========================================================================
// POST /api/withdraw
// =========================================================================

async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let amount_minor = money::parse_minor(&request.amount)?;
    state.ledger.withdraw(user.id, amount_minor)?;
    Ok(Json(OkResponse { ok: true }))
}

// =========================================================================
// POST /api/transfer
// =========================================================================

async fn transfer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let amount_minor = money::parse_minor(&request.amount)?;
    state.ledger.transfer(
        user.id,
        &user.username,
        &request.to_username,
        amount_minor,
        state.registry.as_ref(),
    )?;
    Ok(Json(OkResponse { ok: true }))
}

// =========================================================================
// GET /api/transactions
// =========================================================================

/// Most recent transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let limit = history_limit(query.limit.as_deref());
    let records = state.ledger.recent_transactions(user.id, limit)?;

    let items = records
        .into_iter()
        .map(|record| TransactionItem {
            kind: record.kind,
            amount: money::format_minor(record.amount_minor),
            counterparty: record.counterparty,
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(TransactionsResponse { items }))
}

/// Clamp the requested page size to [1, 100], defaulting to 10.
fn history_limit(raw: Option<&str>) -> usize {
    raw.and_then(|text| text.parse::<i64>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT) as usize
}

// =========================================================================
// Helpers
// =========================================================================

fn start_session(state: &AppState, user: UserRecord) -> Result<Response, AppError> {
    let token = state.sessions.create(SessionUser {
        id: user.id,
        username: user.username,
    });

    let mut response = Json(OkResponse { ok: true }).into_response();
    set_cookie(
        &mut response,
        &format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax"),
    )?;
    Ok(response)
}

fn set_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie).map_err(|e| AppError::Internal(e.to_string()))?;
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(())
}
