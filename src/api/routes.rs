//! HTTP surface: registration/login, trading, and portfolio reads.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::auth::{self, AuthUser};
use crate::engine::{TradeEngine, TradeExecution, TradeHistory};
use crate::error::{StorageError, TradeError};
use crate::ledger::LedgerStore;
use crate::oracle::PriceOracle;
use crate::portfolio::{Portfolio, PortfolioSummary, PositionsReport};
use crate::types::trade::TradeSide;
use crate::types::user::User;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub engine: TradeEngine,
    pub portfolio: Portfolio,
    pub jwt_secret: Vec<u8>,
    pub initial_balance: Decimal,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        oracle: Arc<dyn PriceOracle>,
        jwt_secret: Vec<u8>,
        initial_balance: Decimal,
    ) -> Self {
        Self {
            engine: TradeEngine::new(ledger.clone(), oracle.clone()),
            portfolio: Portfolio::new(ledger.clone(), oracle),
            ledger,
            jwt_secret,
            initial_balance,
        }
    }
}

/// Maps the trade error taxonomy onto HTTP statuses.
pub struct ApiError(pub TradeError);

impl From<TradeError> for ApiError {
    fn from(err: TradeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TradeError::InvalidOrder(_)
            | TradeError::InsufficientFunds { .. }
            | TradeError::NoPosition(_)
            | TradeError::InsufficientShares { .. } => StatusCode::BAD_REQUEST,
            TradeError::UserNotFound => StatusCode::NOT_FOUND,
            TradeError::PriceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TradeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn storage_failure(err: StorageError) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(error = %err, "storage failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

async fn health() -> &'static str {
    "healthy"
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(bad_request("username must not be empty"));
    }
    if req.password.len() < 8 {
        return Err(bad_request("password must be at least 8 characters"));
    }

    let existing = state
        .ledger
        .get_user_by_username(&username)
        .await
        .map_err(storage_failure)?;
    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "username already taken" })),
        ));
    }

    let password_hash = auth::hash_password(&req.password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not hash password" })),
        )
    })?;
    let user = User {
        id: Uuid::new_v4(),
        username: username.clone(),
        password_hash,
        cash_balance: state.initial_balance,
        initial_balance: state.initial_balance,
        created_at: Utc::now(),
    };
    state
        .ledger
        .insert_user(&user)
        .await
        .map_err(storage_failure)?;

    tracing::info!(user_id = %user.id, %username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user_id": user.id, "username": username })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let username = req.username.trim().to_lowercase();
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid username or password" })),
        )
    };

    let user = state
        .ledger
        .get_user_by_username(&username)
        .await
        .map_err(storage_failure)?
        .ok_or_else(invalid)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = auth::create_token(&state.jwt_secret, user.id).map_err(|_| invalid())?;
    Ok(Json(json!({ "token": token, "user_id": user.id })))
}

#[derive(Debug, Deserialize)]
struct TradeRequest {
    symbol: String,
    quantity: i64,
}

async fn buy(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<TradeExecution>, ApiError> {
    let execution = state
        .engine
        .execute_trade(auth_user.user_id, &req.symbol, TradeSide::Buy, req.quantity)
        .await?;
    Ok(Json(execution))
}

async fn sell(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<TradeExecution>, ApiError> {
    let execution = state
        .engine
        .execute_trade(auth_user.user_id, &req.symbol, TradeSide::Sell, req.quantity)
        .await?;
    Ok(Json(execution))
}

async fn positions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<PositionsReport>, ApiError> {
    Ok(Json(state.portfolio.get_positions(auth_user.user_id).await?))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    page: Option<i64>,
    page_size: Option<i64>,
}

async fn history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<Json<TradeHistory>, ApiError> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(20);
    Ok(Json(
        state
            .engine
            .get_trade_history(auth_user.user_id, page, page_size)
            .await?,
    ))
}

async fn summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<PortfolioSummary>, ApiError> {
    Ok(Json(state.portfolio.get_summary(auth_user.user_id).await?))
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/trading/buy", post(buy))
        .route("/trading/sell", post(sell))
        .route("/trading/positions", get(positions))
        .route("/trading/history", get(history))
        .route("/portfolio/summary", get(summary))
        .with_state(state)
}
