//! HTTP transport over the controller.

use std::str::FromStr;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use num_bigint::BigUint;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::controller::Controller;
use crate::error::AppError;

pub fn router(controller: Controller) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/gas-price", get(gas_price))
        .route("/v1/gas-price/valid", get(gas_price_valid))
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

#[derive(Debug, Deserialize)]
struct GasPriceQuery {
    chain: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasPriceValidQuery {
    chain: Option<String>,
    timestamp: Option<String>,
    base_fee_per_gas: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn gas_price(
    State(controller): State<Controller>,
    Query(query): Query<GasPriceQuery>,
) -> Result<Json<Value>, AppError> {
    let chain = require_chain(query.chain)?;
    let timestamp = timestamp_or_now(query.timestamp)?;

    let data = controller.fee_near(&chain, timestamp).await?;
    Ok(Json(json!({ "status": "ok", "data": data })))
}

async fn gas_price_valid(
    State(controller): State<Controller>,
    Query(query): Query<GasPriceValidQuery>,
) -> Result<Json<Value>, AppError> {
    let chain = require_chain(query.chain)?;
    let timestamp = timestamp_or_now(query.timestamp)?;
    let raw_fee = query
        .base_fee_per_gas
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("baseFeePerGas required".into()))?;
    let base_fee_per_gas = BigUint::from_str(raw_fee.trim())
        .map_err(|_| AppError::InvalidInput(format!("invalid baseFeePerGas {:?}", raw_fee)))?;

    let data = controller
        .is_fee_valid(&chain, timestamp, base_fee_per_gas)
        .await?;
    Ok(Json(json!({ "status": "ok", "data": data })))
}

fn require_chain(chain: Option<String>) -> Result<String, AppError> {
    chain
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::InvalidInput("chain required".into()))
}

/// A missing timestamp means "now".
fn timestamp_or_now(raw: Option<String>) -> Result<i64, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Utc::now().timestamp()),
        Some(value) => value
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("invalid timestamp {:?}", value))),
    }
}
