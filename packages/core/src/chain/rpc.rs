//! Ethereum JSON-RPC implementation of [`ChainClient`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::retry::RetryPolicy;
use super::ChainClient;
use crate::error::ChainError;
use crate::types::{BlockFee, FeeData};

pub struct RpcChainClient {
    slug: String,
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    timestamp: String,
    base_fee_per_gas: Option<String>,
    gas_used: Option<String>,
    gas_limit: Option<String>,
}

impl RpcChainClient {
    /// Builds a client whose every HTTP request is bounded by `timeout`.
    pub fn new(
        slug: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChainError> {
        let slug = slug.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Unavailable {
                chain: slug.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            slug,
            url: url.into(),
            http,
            retry: RetryPolicy::default(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn unavailable(&self, message: impl Into<String>) -> ChainError {
        ChainError::Unavailable {
            chain: self.slug.clone(),
            message: message.into(),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> ChainError {
        ChainError::Malformed {
            chain: self.slug.clone(),
            message: message.into(),
        }
    }

    async fn block(&self, height: u64) -> Result<RpcBlock, ChainError> {
        let tag = format!("{:#x}", height);
        let result = self
            .call("eth_getBlockByNumber", json!([tag, false]))
            .await?;

        if result.is_null() {
            return Err(self.malformed(format!("block {} not found", height)));
        }

        serde_json::from_value(result).map_err(|e| self.malformed(format!("block {}: {}", height, e)))
    }

    fn timestamp_of(&self, height: u64, block: &RpcBlock) -> Result<i64, ChainError> {
        parse_u64_quantity(&block.timestamp)
            .and_then(|t| i64::try_from(t).ok())
            .ok_or_else(|| self.malformed(format!("block {} has invalid timestamp", height)))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let client = self;
        self.retry
            .run(
                move || client.send(method, params.clone()),
                |err| matches!(err, ChainError::Unavailable { .. }),
            )
            .await
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("{} returned HTTP {}", method, response.status())));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| self.malformed(format!("{} response is not JSON-RPC: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(self.unavailable(format!(
                "{} failed with code {}: {}",
                method, err.code, err.message
            )));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

fn strip_hex(raw: &str) -> &str {
    raw.strip_prefix("0x").unwrap_or(raw)
}

fn parse_u64_quantity(raw: &str) -> Option<u64> {
    u64::from_str_radix(strip_hex(raw), 16).ok()
}

fn parse_big_quantity(raw: &str) -> Option<BigUint> {
    BigUint::parse_bytes(strip_hex(raw).as_bytes(), 16)
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(parse_u64_quantity)
            .ok_or_else(|| self.malformed(format!("invalid block number {}", result)))
    }

    async fn fee_at(&self, height: u64) -> Result<BlockFee, ChainError> {
        let block = self.block(height).await?;
        let timestamp = self.timestamp_of(height, &block)?;

        let base_fee_per_gas = block
            .base_fee_per_gas
            .as_deref()
            .and_then(parse_big_quantity)
            .ok_or_else(|| self.malformed(format!("block {} has no baseFeePerGas", height)))?;

        let mut fee_data = FeeData::new(base_fee_per_gas);
        if let Some(gas_used) = block.gas_used {
            fee_data.extra.insert("gasUsed".into(), Value::String(gas_used));
        }
        if let Some(gas_limit) = block.gas_limit {
            fee_data.extra.insert("gasLimit".into(), Value::String(gas_limit));
        }

        Ok(BlockFee {
            timestamp,
            fee_data,
        })
    }

    async fn block_timestamp(&self, height: u64) -> Result<i64, ChainError> {
        let block = self.block(height).await?;
        self.timestamp_of(height, &block)
    }
}
